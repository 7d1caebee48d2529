use std::fs::File;
use std::io::{BufWriter, Write};
use std::process;

use clap::Parser;
use gfa::{gfa::GFA, parser::GFAParser};
use handlegraph::hashgraph::HashGraph;

use graphslice::{extract_connecting_graph, GraphSource, GraphsliceError, Pos, Subgraph};

#[derive(Parser)]
#[command(name = "graphslice")]
#[command(about = "Extract the subgraph of a GFA graph connecting two oriented positions")]
struct Args {
    /// Input GFA file
    #[arg(short = 'i', long)]
    input: String,

    /// Output GFA file
    #[arg(short = 'o', long)]
    output: String,

    /// First position, as <id>[+-]:<offset>
    #[arg(long)]
    pos1: String,

    /// Second position, as <id>[+-]:<offset>
    #[arg(long)]
    pos2: String,

    /// Maximum walk length between the positions
    #[arg(short = 'm', long)]
    max_len: i64,

    /// Keep the bases under the positions themselves
    #[arg(long)]
    include_terminals: bool,

    /// Duplicate endpoint nodes so cycles through them survive
    #[arg(long)]
    detect_cycles: bool,

    /// Prune to walks no longer than --max-len
    #[arg(long)]
    strict_max_len: bool,

    /// Prune to nodes and edges on some connecting walk
    #[arg(long)]
    only_paths: bool,

    /// Iteratively remove tips other than the endpoints
    #[arg(long)]
    no_additional_tips: bool,

    /// Verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn run(args: &Args) -> Result<(), GraphsliceError> {
    let parser = GFAParser::new();
    let gfa: GFA<usize, ()> = parser
        .parse_file(&args.input)
        .map_err(|e| GraphsliceError::GfaParse(format!("{:?}", e)))?;
    let graph = HashGraph::from_gfa(&gfa);

    if args.verbose {
        eprintln!(
            "[graphslice] loaded {} nodes from {}",
            graph.node_count(),
            args.input
        );
    }

    let pos_1: Pos = args.pos1.parse()?;
    let pos_2: Pos = args.pos2.parse()?;

    let mut out = Subgraph::new();
    let id_trans = extract_connecting_graph(
        &graph,
        &mut out,
        args.max_len,
        pos_1,
        pos_2,
        args.include_terminals,
        args.detect_cycles,
        args.no_additional_tips,
        args.only_paths,
        args.strict_max_len,
    );

    if out.is_empty() {
        eprintln!(
            "[graphslice] no path within {} bases between {} and {}",
            args.max_len, pos_1, pos_2
        );
    } else if args.verbose {
        eprintln!(
            "[graphslice] extracted {} nodes and {} edges",
            out.node_count(),
            out.edge_count()
        );
        let mut translations: Vec<(u64, u64)> = id_trans.iter().map(|(&k, &v)| (k, v)).collect();
        translations.sort_unstable();
        for (new_id, old_id) in translations {
            eprintln!("[graphslice] node {} <- source node {}", new_id, old_id);
        }
    }

    let file = File::create(&args.output)?;
    let mut writer = BufWriter::new(file);
    out.write_gfa(&mut writer)?;
    writer.flush()?;
    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(&args) {
        eprintln!("[graphslice] error: {}", err);
        process::exit(1);
    }
}
