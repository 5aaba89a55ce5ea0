use gitward::rpc::WorkerServer;
use std::io::{self, BufReader};
use std::path::PathBuf;

fn usage() -> &'static str {
    "usage: gitward-worker --workspace <dir>\nServes capability requests as JSON lines on stdin/stdout."
}

fn parse_workspace(args: &[String]) -> Result<PathBuf, String> {
    let mut workspace = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--workspace" => {
                let value = iter
                    .next()
                    .ok_or_else(|| format!("--workspace requires a value\n{}", usage()))?;
                workspace = Some(PathBuf::from(value));
            }
            "--help" | "-h" => return Err(usage().to_string()),
            other => {
                if let Some(value) = other.strip_prefix("--workspace=") {
                    workspace = Some(PathBuf::from(value));
                } else {
                    return Err(format!("unknown argument `{other}`\n{}", usage()));
                }
            }
        }
    }
    let workspace = match workspace {
        Some(path) => path,
        None => std::env::current_dir().map_err(|e| format!("cannot read current dir: {e}"))?,
    };
    if !workspace.is_dir() {
        return Err(format!("workspace `{}` is not a directory", workspace.display()));
    }
    Ok(workspace)
}

fn run() -> Result<(), String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let workspace = parse_workspace(&args)?;
    let server = WorkerServer::for_workspace(&workspace).map_err(|e| e.to_string())?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    server
        .serve(BufReader::new(stdin.lock()), stdout.lock())
        .map_err(|e| format!("worker io error: {e}"))
}

fn main() {
    if let Err(err) = run() {
        eprintln!("gitward-worker: {err}");
        std::process::exit(1);
    }
}
