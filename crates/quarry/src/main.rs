//! Quarry - query HTML and XML from the command line
//!
//! Usage: quarry [OPTIONS] <SELECTOR> [FILE|URL|-]

use std::collections::BTreeMap;
use std::env;
use std::io::{self, Read};
use std::process::ExitCode;

use log::debug;
use serde::Serialize;

use quarry::{Config, FetchRequest, ParserMode, Quarry, Selection};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Outer,
    Inner,
    Text,
    Json,
    Count,
}

#[derive(Debug, PartialEq, Eq)]
struct Options {
    parser: ParserMode,
    output: Output,
    selector: String,
    /// `None` or `-` reads standard input
    source: Option<String>,
}

enum Command {
    Help,
    Version,
    Run(Options),
}

#[derive(Serialize)]
struct ElementSummary {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("quarry");

    match parse_args(&args[1.min(args.len())..]) {
        Ok(Command::Help) => {
            print_usage(program);
            ExitCode::SUCCESS
        }
        Ok(Command::Version) => {
            println!("Quarry {}", VERSION);
            ExitCode::SUCCESS
        }
        Ok(Command::Run(options)) => match run(&options) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage(program);
            ExitCode::FAILURE
        }
    }
}

fn print_usage(program: &str) {
    println!(
        r#"Quarry {} - query HTML and XML with CSS selectors

USAGE:
    {} [OPTIONS] <SELECTOR> [FILE|URL|-]

OPTIONS:
    -h, --help          Print this help message
    -V, --version       Print version information
    --parser <MODE>     auto, xml, html, html5, html_fragments or soup
    --outer             Print every match as markup (default)
    --html              Print the inner markup of every match
    --text              Print the text of every match
    --json              Print the matches as a JSON array
    --count             Print the number of matches

EXAMPLES:
    {} 'a[href]' page.html
    {} --text 'h1' https://example.com
    cat feed.xml | {} --parser xml --count item
"#,
        VERSION, program, program, program, program
    );
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut parser = ParserMode::Auto;
    let mut output = Output::Outer;
    let mut positional = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-V" | "--version" => return Ok(Command::Version),
            "--parser" => {
                let mode = iter.next().ok_or("--parser needs a mode")?;
                parser = mode.parse().map_err(|_| format!("unknown parser mode '{}'", mode))?;
            }
            "--outer" => output = Output::Outer,
            "--html" => output = Output::Inner,
            "--text" => output = Output::Text,
            "--json" => output = Output::Json,
            "--count" => output = Output::Count,
            "-" => positional.push(arg.clone()),
            flag if flag.starts_with("--") => return Err(format!("unknown option '{}'", flag)),
            _ => positional.push(arg.clone()),
        }
    }

    let mut positional = positional.into_iter();
    let selector = positional.next().ok_or("missing selector")?;
    let source = positional.next();
    if let Some(extra) = positional.next() {
        return Err(format!("unexpected argument '{}'", extra));
    }
    Ok(Command::Run(Options {
        parser,
        output,
        selector,
        source,
    }))
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn load(quarry: &Quarry, source: Option<&str>) -> quarry::Result<Selection> {
    match source {
        None | Some("-") => {
            let mut markup = String::new();
            io::stdin().read_to_string(&mut markup)?;
            debug!("read {} bytes from stdin", markup.len());
            quarry.parse(&markup)
        }
        Some(url) if is_url(url) => quarry.fetch(url, FetchRequest::get()),
        Some(path) => quarry.load_file(path),
    }
}

fn summarize(item: &Selection) -> Option<ElementSummary> {
    let node = item.first()?;
    let tree = node.document().borrow();
    let element = tree.element(node.id())?;
    Some(ElementSummary {
        tag: element.tag_name.clone(),
        attributes: element.attributes.iter().cloned().collect(),
        text: item.text(),
    })
}

fn render(matches: &Selection, output: Output) -> Result<String, String> {
    let lines: Vec<String> = match output {
        Output::Count => vec![matches.len().to_string()],
        Output::Json => {
            let summaries: Vec<ElementSummary> = matches.items().iter().filter_map(summarize).collect();
            vec![serde_json::to_string_pretty(&summaries).map_err(|e| e.to_string())?]
        }
        Output::Text => matches.items().iter().map(Selection::text).collect(),
        Output::Inner => matches.items().iter().filter_map(Selection::html).collect(),
        Output::Outer => matches.items().iter().filter_map(Selection::outer_html).collect(),
    };
    Ok(lines.join("\n"))
}

fn run(options: &Options) -> Result<(), String> {
    let quarry = Quarry::with_config(Config::default().parser(options.parser));
    let document = load(&quarry, options.source.as_deref()).map_err(|e| e.to_string())?;
    let matches = document.query(&options.selector).map_err(|e| e.to_string())?;
    debug!("{} matches for {:?}", matches.len(), options.selector);

    let rendered = render(&matches, options.output)?;
    if !rendered.is_empty() {
        println!("{}", rendered);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn options(list: &[&str]) -> Options {
        match parse_args(&args(list)).unwrap() {
            Command::Run(options) => options,
            _ => panic!("expected a run command"),
        }
    }

    #[test]
    fn test_parse_args() {
        let o = options(&["--parser", "xml", "--count", "item", "feed.xml"]);
        assert_eq!(o.parser, ParserMode::Xml);
        assert_eq!(o.output, Output::Count);
        assert_eq!(o.selector, "item");
        assert_eq!(o.source.as_deref(), Some("feed.xml"));

        let o = options(&["p"]);
        assert_eq!(o.output, Output::Outer);
        assert_eq!(o.source, None);
        assert_eq!(options(&["--html", "p", "-"]).source.as_deref(), Some("-"));
        assert_eq!(options(&["--parser", "soup", "p"]).parser, ParserMode::Soup);
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(matches!(parse_args(&args(&["--help", "p"])), Ok(Command::Help)));
        assert!(matches!(parse_args(&args(&["-V"])), Ok(Command::Version)));
        assert!(parse_args(&args(&[])).is_err());
        assert!(parse_args(&args(&["--parser"])).is_err());
        assert!(parse_args(&args(&["--parser", "sgml", "p"])).is_err());
        assert!(parse_args(&args(&["--bogus", "p"])).is_err());
        assert!(parse_args(&args(&["p", "a", "b"])).is_err());
    }

    #[test]
    fn test_render_modes() {
        let doc = Quarry::new()
            .parse("<ul><li class=\"a\">one <b>1</b></li><li>two</li></ul>")
            .unwrap();
        let li = doc.query("li").unwrap();
        assert_eq!(render(&li, Output::Count).unwrap(), "2");
        assert_eq!(render(&li, Output::Text).unwrap(), "one 1\ntwo");
        assert_eq!(render(&li, Output::Inner).unwrap(), "one <b>1</b>\ntwo");
        assert_eq!(
            render(&li, Output::Outer).unwrap(),
            "<li class=\"a\">one <b>1</b></li>\n<li>two</li>"
        );

        let json: serde_json::Value = serde_json::from_str(&render(&li, Output::Json).unwrap()).unwrap();
        assert_eq!(json[0]["tag"], "li");
        assert_eq!(json[0]["attributes"]["class"], "a");
        assert_eq!(json[1]["text"], "two");
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com"));
        assert!(!is_url("page.html"));
    }
}
