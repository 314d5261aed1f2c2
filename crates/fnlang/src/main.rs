use clap::{Parser, Subcommand};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use fnlang_core::FnError;
use fnlang_eval::Session;
use fnlang_reader::{Node, NodeKind};

#[derive(Parser)]
#[command(name = "fn", about = "fnlang: a Lisp with streaming argument passing", version)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// File to execute ("-" reads stdin)
    file: Option<String>,

    /// Evaluate an expression and print its results
    #[arg(short, long)]
    eval: Option<String>,

    /// Suppress the REPL banner
    #[arg(short, long)]
    quiet: bool,

    /// Enter the REPL after running a file or expression
    #[arg(short, long)]
    interactive: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse source and display the AST
    Ast {
        /// File to parse
        file: Option<String>,

        /// Expression to parse
        #[arg(short, long)]
        eval: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Some(command) = cli.command {
        match command {
            Commands::Ast { file, eval, json } => run_ast(file, eval, json),
        }
        return;
    }

    let mut session = Session::new();

    if let Some(expr) = &cli.eval {
        run_source(&mut session, expr);
        if cli.interactive {
            repl(session, cli.quiet);
        }
        return;
    }

    if let Some(file) = &cli.file {
        let source = match read_source(file) {
            Ok(source) => source,
            Err(err) => {
                eprintln!("Error reading {file}: {err}");
                std::process::exit(1);
            }
        };
        run_source(&mut session, &source);
        if cli.interactive {
            repl(session, cli.quiet);
        }
        return;
    }

    repl(session, cli.quiet);
}

fn read_source(file: &str) -> std::io::Result<String> {
    if file == "-" {
        let mut source = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut source)?;
        Ok(source)
    } else {
        std::fs::read_to_string(file)
    }
}

fn run_source(session: &mut Session, source: &str) {
    match session.eval_str(source) {
        Ok(values) => {
            for value in values {
                println!("{value}");
            }
        }
        Err(err) => {
            print_error(&err);
            std::process::exit(1);
        }
    }
}

fn print_error(err: &FnError) {
    eprintln!("Error: {err}");
}

fn repl(mut session: Session, quiet: bool) {
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(err) => {
            eprintln!("Error: failed to create editor: {err}");
            std::process::exit(1);
        }
    };
    let history_path = dirs_path().join("history.txt");
    let _ = rl.load_history(&history_path);

    if !quiet {
        println!("fnlang v{}", env!("CARGO_PKG_VERSION"));
        println!("Type ,help for help, ,quit to exit\n");
    }

    let mut buffer = String::new();
    let mut in_multiline = false;

    loop {
        let prompt = if in_multiline { " .. " } else { "fn> " };
        match rl.readline(prompt) {
            Ok(line) => {
                if !in_multiline {
                    match line.trim() {
                        ",quit" | ",exit" | ",q" => break,
                        ",help" | ",h" => {
                            print_help();
                            continue;
                        }
                        _ => {}
                    }
                }

                if in_multiline {
                    buffer.push('\n');
                    buffer.push_str(&line);
                } else {
                    buffer = line.clone();
                }

                let input = buffer.trim().to_string();
                if input.is_empty() {
                    in_multiline = false;
                    continue;
                }

                match session.eval_str(&input) {
                    Ok(values) => {
                        in_multiline = false;
                        buffer.clear();
                        let _ = rl.add_history_entry(&input);
                        for value in values {
                            println!("{value}");
                        }
                    }
                    // the reader ran out of input mid-form: keep reading
                    Err(err) if err.is_unexpected_eof() => {
                        in_multiline = true;
                    }
                    Err(err) => {
                        in_multiline = false;
                        buffer.clear();
                        let _ = rl.add_history_entry(&input);
                        print_error(&err);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                if in_multiline {
                    buffer.clear();
                    in_multiline = false;
                    println!("^C");
                    continue;
                }
                break;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {err}");
                break;
            }
        }
    }

    let _ = std::fs::create_dir_all(dirs_path());
    let _ = rl.save_history(&history_path);
}

fn print_help() {
    println!("fnlang REPL commands:");
    println!("  ,quit / ,q    Exit the REPL");
    println!("  ,help / ,h    Show this help");
    println!();
    println!("Core forms:");
    println!("  (set NAME VALUE)            bind a name");
    println!("  (get NAME)                  look a name up");
    println!("  (defn NAME [PARAMS] BODY)   define a function");
    println!("  (fn [PARAMS] BODY)          anonymous function");
    println!("  (when COND VAL ... [ELSE])  conditional pairs");
    println!("  (+ - * / = echo print push assert)");
}

fn run_ast(file: Option<String>, eval: Option<String>, json: bool) {
    let source = match (&file, &eval) {
        (Some(path), None) => match read_source(path) {
            Ok(source) => source,
            Err(err) => {
                eprintln!("Error reading {path}: {err}");
                std::process::exit(1);
            }
        },
        (None, Some(expr)) => expr.clone(),
        (Some(_), Some(_)) => {
            eprintln!("Error: cannot specify both a file and --eval");
            std::process::exit(1);
        }
        (None, None) => {
            eprintln!("Error: provide a file or --eval expression");
            std::process::exit(1);
        }
    };

    let root = match fnlang_reader::parse(&source) {
        Ok(root) => root,
        Err(err) => {
            eprintln!("Parse error: {err}");
            std::process::exit(1);
        }
    };

    if json {
        let forms: Vec<serde_json::Value> = root.children().iter().map(node_to_json).collect();
        let output = if forms.len() == 1 {
            serde_json::to_string_pretty(&forms[0])
        } else {
            serde_json::to_string_pretty(&forms)
        };
        match output {
            Ok(text) => println!("{text}"),
            Err(err) => {
                eprintln!("Error: {err}");
                std::process::exit(1);
            }
        }
    } else {
        for (i, form) in root.children().iter().enumerate() {
            if i > 0 {
                println!();
            }
            print_ast(form, 0);
        }
    }
}

fn node_to_json(node: &Node) -> serde_json::Value {
    use serde_json::json;
    match node.kind() {
        NodeKind::Int(n) => json!({ "type": "int", "value": n }),
        NodeKind::Float(f) => json!({ "type": "float", "value": f }),
        NodeKind::String(s) => json!({ "type": "string", "value": s }),
        NodeKind::Symbol(s) => json!({ "type": "symbol", "value": s }),
        NodeKind::Atom(s) => json!({ "type": "atom", "value": s }),
        NodeKind::List(items) => json!({
            "type": "list",
            "children": items.iter().map(node_to_json).collect::<Vec<_>>(),
        }),
        NodeKind::Map(items) => json!({
            "type": "map",
            "children": items.iter().map(node_to_json).collect::<Vec<_>>(),
        }),
        NodeKind::Expression(items) => json!({
            "type": "expression",
            "children": items.iter().map(node_to_json).collect::<Vec<_>>(),
        }),
    }
}

fn print_ast(node: &Node, indent: usize) {
    let pad = "  ".repeat(indent);
    match node.kind() {
        NodeKind::Int(n) => println!("{pad}Int {n}"),
        NodeKind::Float(f) => println!("{pad}Float {f}"),
        NodeKind::String(s) => println!("{pad}String {s:?}"),
        NodeKind::Symbol(s) => println!("{pad}Symbol {s}"),
        NodeKind::Atom(s) => println!("{pad}Atom {s}"),
        NodeKind::List(items) => {
            println!("{pad}List");
            for item in items {
                print_ast(item, indent + 1);
            }
        }
        NodeKind::Map(items) => {
            println!("{pad}Map");
            for item in items {
                print_ast(item, indent + 1);
            }
        }
        NodeKind::Expression(items) => {
            println!("{pad}Expression");
            for item in items {
                print_ast(item, indent + 1);
            }
        }
    }
}

fn dirs_path() -> std::path::PathBuf {
    std::env::var("HOME")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("."))
        .join(".fnlang")
}
