use clap::Parser;
use folio::{
    Retriever,
    cli::{Cli, Command, JobsArgs, QueryArgs},
    error,
    jobs,
    mcp,
    output::{self, QueryReport},
};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("FOLIO_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    let options = cli.retriever_options()?;
    let mut retriever = Retriever::open(&options)?;

    match &cli.command {
        Command::Query(args) => {
            populate_or_warn(&mut retriever);
            cmd_query(&mut retriever, args)?;
        }
        Command::Index => {
            let inserted = retriever.ensure_populated()?;
            report_indexed(&retriever, inserted, "Index already populated.");
        }
        Command::Reindex => {
            let inserted = retriever.reindex()?;
            report_indexed(&retriever, inserted, "Index is empty.");
        }
        Command::Status(args) => {
            let status = retriever.status();
            if args.json {
                output::format_json(&status)?;
            } else {
                output::format_status_human(&status);
            }
        }
        Command::Jobs(args) => {
            populate_or_warn(&mut retriever);
            cmd_jobs(&mut retriever, args)?;
        }
        Command::Mcp => {
            mcp::run_mcp(retriever)?;
        }
        Command::Completions(_) => {}
    }

    Ok(())
}

/// Log population failures; queries run against whatever the index holds.
fn populate_or_warn(retriever: &mut Retriever) {
    if let Err(e) = retriever.ensure_populated() {
        tracing::warn!(error = %e, "failed to populate semantic index");
    }
}

fn report_indexed(retriever: &Retriever, inserted: usize, unchanged: &str) {
    match retriever.backend() {
        folio::BackendKind::Lexical => {
            eprintln!("Lexical backend active, nothing to index.");
        }
        folio::BackendKind::Semantic if inserted == 0 => {
            eprintln!("{unchanged}");
        }
        folio::BackendKind::Semantic => {
            eprintln!("Indexed {inserted} entries.");
        }
    }
}

fn cmd_query(retriever: &mut Retriever, args: &QueryArgs) -> error::Result<()> {
    let skills = args.skill_set();
    let links = retriever.query_links(skills.clone());
    let ranking = args.explain.then(|| retriever.explain(skills.clone()));

    let mut report = QueryReport::new(&skills, retriever.backend(), &links);
    if let Some(ranking) = &ranking {
        report = report.with_ranking(ranking);
    }

    if args.json {
        output::format_json(&report)?;
    } else {
        output::format_query_human(&report);
    }
    Ok(())
}

fn cmd_jobs(retriever: &mut Retriever, args: &JobsArgs) -> error::Result<()> {
    let extracted = jobs::load_jobs(&args.file)?;
    let evidence = jobs::match_jobs(retriever, &extracted);

    if args.json {
        output::format_json(&evidence)?;
    } else {
        output::format_jobs_human(&evidence);
    }
    Ok(())
}
