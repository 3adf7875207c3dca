//! Punto de entrada ("driver").
//!
//! Este módulo orquesta las diferentes fases del proceso de
//! compilación y expone una CLI.

use anyhow::{self, bail, Context};
use arithc::{
    error::{CompileError, Diagnostics},
    link::{LinkOptions, Linker},
    parse::{Config, Options, DEFAULT_MAX_HEIGHT, DEFAULT_MAX_NESTING},
    source::Source,
    target::{self, Arch},
};

use clap::{self, crate_version, error::ErrorKind, Arg, ArgMatches, Command};
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    process::ExitCode,
    str::FromStr,
};

use tracing::{info, level_filters::LevelFilter};

/// Razones por las cuales una ejecución puede fallar.
enum Failure {
    /// Error en la expresión de entrada, se reporta con su ubicación.
    Compile(Diagnostics),

    /// Error de E/S, de enlazado o de uso.
    Other(anyhow::Error),
}

impl From<anyhow::Error> for Failure {
    fn from(error: anyhow::Error) -> Self {
        Failure::Other(error)
    }
}

impl From<CompileError> for Failure {
    fn from(error: CompileError) -> Self {
        Failure::Compile(Diagnostics::from(error))
    }
}

fn main() -> ExitCode {
    // Parsing de CLI. Un número incorrecto de argumentos termina con
    // código 1 antes de cualquier análisis léxico
    let args = match cli().try_get_matches() {
        Ok(args) => args,
        Err(error) => {
            let _ = error.print();
            return match error.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    init_logging(args.occurrences_of("verbose"));

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,

        Err(Failure::Compile(diagnostics)) => {
            eprint!("{}", diagnostics);
            ExitCode::FAILURE
        }

        Err(Failure::Other(error)) => {
            eprintln!("Error: {:?}", error);
            ExitCode::FAILURE
        }
    }
}

fn cli() -> Command<'static> {
    Command::new("arithc")
        .version(crate_version!())
        .about("Compiles an arithmetic expression to stack-machine assembly")
        .after_help(
            "EXPR may begin with '-', so short options must come after it \
             (or use their long forms).",
        )
        .arg(
            Arg::new("EXPR")
                .required(true)
                .allow_hyphen_values(true)
                .help("Expression to compile, such as '1+2*3'"),
        )
        .arg(
            Arg::new("target")
                .short('t')
                .long("target")
                .value_name("ARCH")
                .takes_value(true)
                .default_value(Arch::host().name())
                .possible_values(["x86_64", "x86-64", "aarch64", "arm64"])
                .help("Target architecture"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .takes_value(true)
                .default_value("-")
                .help("Output file ('-' for stdout)"),
        )
        .arg(
            Arg::new("link")
                .short('c')
                .long("link")
                .help("Assemble and link an executable instead of emitting assembly"),
        )
        .arg(
            Arg::new("strip")
                .short('s')
                .long("strip")
                .requires("link")
                .help("Strip executables"),
        )
        .arg(
            Arg::new("lenient")
                .long("lenient")
                .help("Ignore tokens left over after a complete expression"),
        )
        .arg(
            Arg::new("max-nesting")
                .long("max-nesting")
                .value_name("N")
                .takes_value(true)
                .help("Maximum depth of nested parentheses [default: 256]"),
        )
        .arg(
            Arg::new("max-height")
                .long("max-height")
                .value_name("N")
                .takes_value(true)
                .help(
                    "Maximum height of the syntax tree; long operator chains \
                     such as 1+1+...+1 count too [default: 65536]",
                ),
        )
        .arg(
            Arg::new("entry")
                .long("entry")
                .value_name("SYMBOL")
                .takes_value(true)
                .default_value("main")
                .help("Global symbol of the generated routine"),
        )
        .arg(
            Arg::new("eval")
                .long("eval")
                .conflicts_with("link")
                .help("Print the value of the expression instead of compiling it"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .multiple_occurrences(true)
                .help("Log progress to stderr (repeat for more detail)"),
        )
}

fn run(args: &ArgMatches) -> Result<(), Failure> {
    let expression = args.value_of("EXPR").context("Missing expression")?;
    let config = parser_config(args)?;

    let source = Source::new(expression);
    let ast = arithc::compile(&source, config)?;

    if args.is_present("eval") {
        let value = ast
            .evaluate()
            .context("Expression divides by zero or overflows a division")?;

        println!("{}", value);
        return Ok(());
    }

    // Se extraen argumentos necesarios
    let arch = args.value_of("target").context("Missing target")?;
    let arch = Arch::from_str(arch).map_err(|()| anyhow::anyhow!("Bad target: {}", arch))?;
    let entry = args.value_of("entry").context("Missing entry symbol")?;
    let output = args.value_of("output").context("Missing output")?;

    info!(%arch, entry, output, "compiling");

    match (args.is_present("link"), output) {
        // Salida a stdout sin enlazado
        (false, "-") => {
            let stdout = io::stdout();
            let mut stdout = stdout.lock();

            target::emit(&ast, arch, entry, &mut stdout)
                .and_then(|()| stdout.flush())
                .context("Failed to emit to stdout")?;
        }

        // Salida a archivo sin enlazado
        (false, path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to open for writing: {}", path))?;

            let mut file = BufWriter::new(file);
            target::emit(&ast, arch, entry, &mut file)
                .and_then(|()| file.flush())
                .with_context(|| format!("Failed to emit to file: {}", path))?;
        }

        // Salida a stdout con enlazado
        (true, "-") => {
            return Err(anyhow::anyhow!("Refusing to write executable to stdout").into());
        }

        // Salida a archivo con enlazado
        (true, path) => {
            let mut options = LinkOptions::empty();
            if args.is_present("strip") {
                options |= LinkOptions::STRIP;
            }

            let mut linker = Linker::spawn(arch, &path, options).context("Failed to link")?;
            target::emit(&ast, arch, entry, linker.stdin())
                .context("Failed to emit assembly to assembler")?;

            linker
                .finish()
                .with_context(|| format!("Failed to generate executable: {}", path))?;
        }
    };

    Ok(())
}

fn parser_config(args: &ArgMatches) -> anyhow::Result<Config> {
    let limit = |name: &str, default: usize| -> anyhow::Result<usize> {
        let limit = match args.value_of(name) {
            None => return Ok(default),
            Some(value) => value
                .parse::<usize>()
                .with_context(|| format!("Invalid value for --{}: {}", name, value))?,
        };

        if limit == 0 {
            bail!("--{} must be at least 1", name);
        }

        Ok(limit)
    };

    let mut options = Options::empty();
    if args.is_present("lenient") {
        options |= Options::ALLOW_TRAILING;
    }

    Ok(Config {
        options,
        max_nesting: limit("max-nesting", DEFAULT_MAX_NESTING)?,
        max_height: limit("max-height", DEFAULT_MAX_HEIGHT)?,
    })
}

fn init_logging(verbosity: u64) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .init();
}
