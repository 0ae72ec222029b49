//! unless CLI: evaluate declarative skip options against a call.
//!
//! Subcommands:
//! - `eval <options> --name <name> [--type <type>] [--strict]`: print `skip` or `run`
//! - `trace <options> --name <name> [--type <type>] [--strict]`: print every criterion
//! - `check <options>`: validate options load in strict mode
//!
//! Set `RUST_LOG=unless=debug` to see normalization decisions.

use std::process;

use unless::{Call, MatchSpec, Normalizer, OptionsConfig, Strictness};

fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "eval" => cmd_eval(&args[2..]),
        "trace" => cmd_trace(&args[2..]),
        "check" => cmd_check(&args[2..]),
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("error: unknown command \"{other}\"");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "unless=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Commands
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_eval(args: &[String]) -> Result<(), String> {
    let (spec, call) = prepare(args, "eval")?;
    let skip = spec
        .should_skip(&call)
        .map_err(|e| format!("evaluation failed: {e}"))?;

    println!("{}", if skip { "skip" } else { "run" });
    Ok(())
}

fn cmd_trace(args: &[String]) -> Result<(), String> {
    let (spec, call) = prepare(args, "trace")?;
    print!("{}", spec.evaluate_with_trace(&call));
    Ok(())
}

fn cmd_check(args: &[String]) -> Result<(), String> {
    let Some(path) = args.first() else {
        return Err("check requires an options file path".into());
    };
    if let Some(extra) = args.get(1) {
        return Err(format!("unexpected argument \"{extra}\""));
    }

    let spec = load_spec(path, Strictness::Strict).map_err(|e| format!("options invalid: {e}"))?;

    println!(
        "Options valid: {} name(s), {} type(s)",
        spec.names().len(),
        spec.types().len()
    );
    Ok(())
}

fn prepare(args: &[String], command: &str) -> Result<(MatchSpec<Call>, Call), String> {
    let Some(path) = args.first() else {
        return Err(format!("{command} requires an options file path"));
    };
    let call_args = parse_call_args(&args[1..])?;
    let spec = load_spec(path, call_args.strictness)?;
    Ok((spec, call_args.call))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Options loading
// ═══════════════════════════════════════════════════════════════════════════════

fn load_spec(path: &str, strictness: Strictness) -> Result<MatchSpec<Call>, String> {
    let config = OptionsConfig::from_path(path).map_err(|e| e.to_string())?;
    Normalizer::new()
        .with_strictness(strictness)
        .load(config)
        .map_err(|e| e.to_string())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Argument parsing
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
struct CallArgs {
    call: Call,
    strictness: Strictness,
}

fn parse_call_args(args: &[String]) -> Result<CallArgs, String> {
    let mut name = None;
    let mut call_type = None;
    let mut strictness = Strictness::Permissive;
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--name" => {
                i += 1;
                name = Some(args.get(i).ok_or("--name requires a value")?.clone());
            }
            "--type" => {
                i += 1;
                call_type = Some(args.get(i).ok_or("--type requires a value")?.clone());
            }
            "--strict" => strictness = Strictness::Strict,
            other => return Err(format!("unexpected argument \"{other}\"")),
        }
        i += 1;
    }

    let name = name.ok_or("--name is required")?;
    let call = match call_type {
        Some(t) => Call::new(name, t),
        None => Call::unary(name),
    };
    Ok(CallArgs { call, strictness })
}

fn print_usage() {
    eprintln!(
        "Usage: unless <command> [options]

Commands:
  eval <options> --name <name> [--type <type>] [--strict]    Print skip or run
  trace <options> --name <name> [--type <type>] [--strict]   Show each criterion
  check <options>                                            Validate options (strict)
  help                                                       Show this help

<options> is a YAML or JSON file; --type defaults to unary."
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use unless::CallContext;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    /// An options file in its own temp directory, removed on drop.
    struct TempOptions {
        dir: PathBuf,
        path: PathBuf,
    }

    impl TempOptions {
        fn new(file: &str, content: &str) -> Self {
            let dir = std::env::temp_dir()
                .join(format!("unless-cli-test-{}-{file}", process::id()));
            std::fs::create_dir_all(&dir).unwrap();
            let path = dir.join(file);
            std::fs::write(&path, content).unwrap();
            Self { dir, path }
        }

        fn path(&self) -> &str {
            self.path.to_str().unwrap()
        }
    }

    impl Drop for TempOptions {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }

    #[test]
    fn parse_call_args_defaults_to_unary() {
        let parsed = parse_call_args(&args(&["--name", "testCall"])).unwrap();
        assert_eq!(parsed.call.name(), "testCall");
        assert_eq!(parsed.call.call_type(), "unary");
        assert_eq!(parsed.strictness, Strictness::Permissive);
    }

    #[test]
    fn parse_call_args_type_and_strict() {
        let parsed =
            parse_call_args(&args(&["--type", "duplex", "--strict", "--name", "Chat"])).unwrap();
        assert_eq!(parsed.call.call_type(), "duplex");
        assert_eq!(parsed.strictness, Strictness::Strict);
    }

    #[test]
    fn parse_call_args_errors() {
        assert!(parse_call_args(&[]).is_err());
        assert!(parse_call_args(&args(&["--name"])).is_err());
        assert!(parse_call_args(&args(&["--name", "x", "--bogus"])).is_err());
    }

    #[test]
    fn load_yaml_options() {
        let file = TempOptions::new(
            "mixed.yaml",
            "type: [duplex, request_stream]\nname: [Other, { regex: fake, ignore_case: true }]\n",
        );
        let spec = load_spec(file.path(), Strictness::Permissive).unwrap();

        assert!(!spec.should_skip(&Call::unary("testCall")).unwrap());
        assert!(spec.should_skip(&Call::new("testCall", "duplex")).unwrap());
        assert!(spec.should_skip(&Call::unary("isFake")).unwrap());
    }

    #[test]
    fn load_json_options() {
        let file = TempOptions::new("name.json", r#""TestCall""#);
        let spec = load_spec(file.path(), Strictness::Permissive).unwrap();
        assert!(spec.should_skip(&Call::unary("testCall")).unwrap());
    }

    #[test]
    fn strict_load_rejects_unrecognized() {
        let file = TempOptions::new("number.yaml", "42\n");
        assert!(load_spec(file.path(), Strictness::Permissive).is_ok());
        assert!(load_spec(file.path(), Strictness::Strict).is_err());
        assert!(cmd_check(&[file.path().to_owned()]).is_err());
    }

    #[test]
    fn temp_options_are_removed() {
        let file = TempOptions::new("cleanup.yaml", "TestCall\n");
        let dir = file.dir.clone();
        assert!(dir.exists());
        drop(file);
        assert!(!dir.exists());
    }

    #[test]
    fn missing_file() {
        let err = load_spec("/nonexistent/options.yaml", Strictness::Permissive).unwrap_err();
        assert!(err.contains("failed to read"));
    }
}
