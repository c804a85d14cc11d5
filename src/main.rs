use axpath::{AxPathError, InMemoryBridge, Session, SessionId, parse, resolve, snapshots};
use std::env;
use std::process;

/// Session id given to trees loaded from a fixture file.
const FIXTURE_SESSION: SessionId = SessionId::new(1);

/// Parses a query and, given a JSON tree, prints the attributes of every match.
fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if !(2..=3).contains(&args.len()) {
        let program = program_name(&args);
        eprintln!("Parses an accessibility query and optionally resolves it against a tree.");
        eprintln!();
        eprintln!("Usage: {} <query> [path/to/tree.json]", program);
        eprintln!();
        eprintln!("Example:");
        eprintln!("  {} \"//panel/check box[@name='Chin']\" tree.json", program);
        process::exit(1);
    }

    if let Err(e) = run(&args[1], args.get(2).map(String::as_str)) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// The name the tool was invoked as, for the usage text.
fn program_name(args: &[String]) -> &str {
    args.first().map_or("axpath", String::as_str)
}

fn run(text: &str, tree_path: Option<&str>) -> Result<(), AxPathError> {
    let query = parse(text)?;
    println!("Query: {}", query);
    for (index, step) in query.steps().iter().enumerate() {
        println!("  step {}: {:?} {}", index + 1, step.axis, step);
    }

    let Some(path) = tree_path else {
        return Ok(());
    };
    log::info!("Loading tree from {}", path);
    let bridge = InMemoryBridge::from_json_file(FIXTURE_SESSION, path)?;
    let session = Session::new(FIXTURE_SESSION, &bridge);
    let root = session.adopt(bridge.root());

    let found = resolve(&session, &query, &root);
    let result = found.map_err(AxPathError::from).and_then(|handles| {
        let attributes = snapshots(&session, &handles);
        session.release_all(handles);
        println!("{}", serde_json::to_string_pretty(&attributes)?);
        eprintln!("{} matches", attributes.len());
        Ok(())
    });
    session.release(root);
    log::debug!("Handle usage: {:?}", session.stats());
    result
}
