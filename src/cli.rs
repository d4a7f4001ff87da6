use bfgen::{
    compile, frontend,
    vm::{self, Interpreter, Program, StandardDevice},
    Options,
};
use clap::*;
use codespan_reporting::{
    diagnostic::{Diagnostic, Label},
    files::SimpleFiles,
    term::{
        emit,
        termcolor::{ColorChoice, StandardStream},
    },
};
use log::{debug, info};
use std::{
    fmt,
    fs::{read_to_string, write},
};

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum TargetType {
    /// Write the compiled program to the output file.
    Bf,
    /// Run the compiled program on the built-in interpreter.
    Run,
}

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// The input file to compile.
    #[clap(value_parser)]
    input: String,

    /// The file to write the compiled program to.
    #[clap(short, long, value_parser, default_value = "out.bf")]
    output: String,

    /// Annotate the output with what each line does.
    #[clap(short, long)]
    comments: bool,

    /// Bracket every primitive with trace markers.
    #[clap(short, long)]
    debug: bool,

    /// Run the peephole optimizer over the output.
    #[clap(short = 'O', long)]
    optimize: bool,

    /// What to do with the compiled program.
    #[clap(short, long, value_parser, default_value = "bf")]
    target: TargetType,

    /// Log more (repeat for even more).
    #[clap(short, long, action = ArgAction::Count)]
    verbose: u8,
}

enum Error {
    IO(std::io::Error),
    Compile(bfgen::Error),
    Parse(vm::Error),
    Interpreter(vm::Error),
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::IO(e) => write!(f, "IO error: {:?}", e),
            Error::Compile(e) => write!(f, "{}", e),
            Error::Parse(e) => write!(f, "Parse error: {}", e),
            Error::Interpreter(e) => write!(f, "Interpreter error: {}", e),
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    let mut builder = env_logger::Builder::from_default_env();
    builder.format_timestamp(None);
    builder.filter(None, level);
    builder.init();
}

/// Print a compile error against the source it came from.
fn report(filename: &str, source: &str, err: &bfgen::Error) {
    let Some(span) = err.span() else {
        return;
    };
    // Spans refer to the source with its comments removed.
    let code = frontend::strip_comments(source);

    let mut files = SimpleFiles::new();
    let file_id = files.add(filename, code);
    let diagnostic = Diagnostic::error()
        .with_message(err.to_string())
        .with_labels(vec![Label::primary(file_id, span).with_message(match err {
            bfgen::Error::Frontend(e) => e.to_string(),
            bfgen::Error::Codegen(e) => e.kind().to_string(),
        })]);

    let writer = StandardStream::stderr(ColorChoice::Always);
    let mut lock = writer.lock();
    let config = codespan_reporting::term::Config::default();
    if let Err(e) = emit(&mut lock, &config, &files, &diagnostic) {
        debug!("could not render diagnostic: {e}");
    }
}

fn write_file(file: &str, contents: String) -> Result<(), Error> {
    write(file, contents).map_err(Error::IO)
}

fn read_file(name: &str) -> Result<String, Error> {
    read_to_string(name).map_err(Error::IO)
}

fn main() -> Result<(), Error> {
    let args = Args::parse();
    init_logging(args.verbose);

    let options = Options {
        comments: args.comments,
        debug: args.debug,
        optimize: args.optimize,
    };
    let source = read_file(&args.input)?;
    let output = compile(&source, &options).map_err(|e| {
        report(&args.input, &source, &e);
        Error::Compile(e)
    })?;

    match args.target {
        TargetType::Bf => {
            info!("writing {} bytes to {}", output.len(), args.output);
            write_file(&args.output, output)?
        }
        TargetType::Run => {
            let program: Program = output.parse().map_err(Error::Parse)?;
            Interpreter::new(StandardDevice)
                .run(&program)
                .map_err(Error::Interpreter)?
        }
    }
    Ok(())
}
