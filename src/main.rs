use chrono::{DateTime, Utc};
use clap::Parser;
use structbind::{record, BindOptions, Binder, RawJson, Source, Value};

/// Simple runner: bind a JSON document into a sample account record.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON document (string). You can also pipe a file using shell quoting.
    json: String,
    /// Bind as raw text: tagged fields only match their tag names
    #[arg(long)]
    raw: bool,
    /// Bind options as JSON, e.g. '{"unicode_case_fold":true}'
    #[arg(long)]
    options: Option<String>,
    /// Log each bound field to stderr
    #[arg(long)]
    verbose: bool,
}

record! {
    #[derive(Debug, Default)]
    struct Audit {
        #[tag("createdAt")]
        pub created_at: Option<DateTime<Utc>>,
        #[tag("updatedBy,omitempty")]
        pub updated_by: String,
    }
}

record! {
    #[derive(Debug, Default)]
    struct Account {
        #[tag("id,string")]
        pub id: u64,
        pub name: String,
        pub active: Option<bool>,
        pub tags: Vec<String>,
        pub extra: RawJson,
        #[embed]
        pub audit: Audit,
    }
}

fn main() {
    // Parse CLI arguments.
    let args = Args::parse();

    if args.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_writer(std::io::stderr)
            .init();
    }

    // Build options.
    let options = match args.options.as_deref().map(BindOptions::from_json) {
        Some(Ok(opts)) => opts,
        Some(Err(e)) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
        None => BindOptions::default(),
    };

    // Raw text goes through the strict path; otherwise decode first.
    let source = if args.raw {
        Source::Text(args.json)
    } else {
        match Value::from_json_text(&args.json) {
            Ok(v) => Source::Value(v),
            Err(e) => {
                eprintln!("Invalid JSON: {e}");
                std::process::exit(1);
            }
        }
    };

    let mut account = Account::default();
    if let Err(e) = Binder::new().with_options(options).bind(source, &mut account) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    let out = structbind::to_value(&account).to_json();
    match serde_json::to_string_pretty(&out) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
