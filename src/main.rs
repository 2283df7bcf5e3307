use std::io::{IsTerminal, Read};

use clap::Parser;

use marsh::shell::Shell;
use marsh::{reader, sys};

#[derive(Parser)]
#[command(name = "marsh")]
#[command(about = "An interactive POSIX shell with the customary bash conveniences")]
#[command(version)]
struct Cli {
    /// Execute a command string; remaining operands become $0, $1, ...
    #[arg(short = 'c')]
    command: Option<String>,

    /// Force interactive mode
    #[arg(short = 'i')]
    interactive: bool,

    /// Act as a login shell
    #[arg(short = 'l', long = "login")]
    login: bool,

    /// Read commands from stdin even when operands are present
    #[arg(short = 's')]
    stdin: bool,

    /// Exit on the first failing command (set -e)
    #[arg(short = 'e')]
    errexit: bool,

    /// Treat unset variables as errors (set -u)
    #[arg(short = 'u')]
    nounset: bool,

    /// Trace commands after expansion (set -x)
    #[arg(short = 'x')]
    xtrace: bool,

    /// Disable pathname expansion (set -f)
    #[arg(short = 'f')]
    noglob: bool,

    /// Enable a long option (set -o NAME)
    #[arg(short = 'o', value_name = "OPTION")]
    options_on: Vec<String>,

    /// Skip the rc file
    #[arg(long = "norc")]
    norc: bool,

    /// Use FILE instead of ~/.marshrc
    #[arg(long = "rcfile", value_name = "FILE")]
    rcfile: Option<String>,

    /// Dump the token stream before parsing
    #[arg(long = "dump-tokens")]
    dump_tokens: bool,

    /// Dump the AST before execution
    #[arg(long = "dump-ast")]
    dump_ast: bool,

    /// Trace the expansion engine
    #[arg(long = "trace-expand")]
    trace_expand: bool,

    /// Trace fork/exec and builtin dispatch
    #[arg(long = "trace-exec")]
    trace_exec: bool,

    /// Trace scope pushes and pops
    #[arg(long = "trace-scopes")]
    trace_scopes: bool,

    /// Script file and its arguments
    #[arg(trailing_var_arg = true)]
    operands: Vec<String>,
}

fn main() {
    // `+o OPTION` pairs are extracted by hand; the option parser only
    // understands `-` prefixes.
    let mut options_off = Vec::new();
    let mut forwarded = Vec::new();
    let mut raw = std::env::args().peekable();
    while let Some(arg) = raw.next() {
        if arg == "+o" {
            if let Some(name) = raw.next() {
                options_off.push(name);
            }
        } else {
            forwarded.push(arg);
        }
    }
    let cli = Cli::parse_from(forwarded);

    let script_path = if cli.command.is_none() && !cli.stdin {
        cli.operands.first().cloned()
    } else {
        None
    };

    let interactive = cli.interactive
        || (cli.command.is_none() && script_path.is_none() && std::io::stdin().is_terminal());

    let script_name = script_path.clone().unwrap_or_else(|| "marsh".to_string());
    let mut shell = Shell::new(script_name, interactive);

    shell.options.errexit = cli.errexit;
    shell.options.nounset = cli.nounset;
    shell.options.xtrace = cli.xtrace;
    shell.options.noglob = cli.noglob;
    shell.trace.tokens = cli.dump_tokens;
    shell.trace.ast = cli.dump_ast;
    shell.trace.expansion = cli.trace_expand;
    shell.trace.exec = cli.trace_exec;
    shell.trace.scopes = cli.trace_scopes;
    for name in &cli.options_on {
        match shell.options.by_name(name) {
            Some(option) => *option = true,
            None => {
                eprintln!("marsh: -o {name}: invalid option name");
                std::process::exit(2);
            }
        }
    }
    for name in &options_off {
        match shell.options.by_name(name) {
            Some(option) => *option = false,
            None => {
                eprintln!("marsh: +o {name}: invalid option name");
                std::process::exit(2);
            }
        }
    }

    if cli.login {
        if let Some(home) = shell.get_var("HOME") {
            reader::load_rc_file(&mut shell, &format!("{home}/.profile"));
        }
    }
    if interactive && !cli.norc {
        let rc = cli
            .rcfile
            .clone()
            .or_else(|| reader::default_rc_path(&shell));
        if let Some(rc) = rc {
            reader::load_rc_file(&mut shell, &rc);
        }
    }

    let status = if let Some(command) = cli.command {
        // Operands after the string become $0 and the positionals.
        if let Some(zero) = cli.operands.first() {
            shell.vars.positional_mut().zero = zero.clone();
            shell.script_name = zero.clone();
        }
        shell.vars.positional_mut().params = cli.operands.iter().skip(1).cloned().collect();
        reader::run_source(&mut shell, &command)
    } else if let Some(path) = script_path {
        shell.vars.positional_mut().zero = path.clone();
        shell.vars.positional_mut().params = cli.operands.iter().skip(1).cloned().collect();
        reader::run_file(&mut shell, &path)
    } else if interactive {
        reader::repl::run_interactive(&mut shell)
    } else {
        // Non-interactive stdin; with -s the operands become the
        // positional parameters.
        if cli.stdin {
            shell.vars.positional_mut().params = cli.operands.clone();
        }
        let mut source = String::new();
        if std::io::stdin().read_to_string(&mut source).is_err() {
            let _ = sys::write_fd(sys::STDERR_FD, b"marsh: cannot read stdin\n");
            std::process::exit(2);
        }
        reader::run_source(&mut shell, &source)
    };

    std::process::exit(status & 0xff);
}
