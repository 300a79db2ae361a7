use super::*;

#[test]
fn parses_analyze_with_default_limit() {
    let cli = Cli::try_parse_from(["tagpulse", "analyze", "#여행"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Analyze { ref hashtag, limit: 100 } if hashtag == "#여행"
    ));
}

#[test]
fn parses_analyze_with_limit() {
    let cli = Cli::try_parse_from(["tagpulse", "analyze", "travel", "--limit", "500"]).unwrap();
    assert!(matches!(cli.command, Commands::Analyze { limit: 500, .. }));
}

#[test]
fn rejects_limit_below_minimum() {
    assert!(Cli::try_parse_from(["tagpulse", "analyze", "travel", "--limit", "19"]).is_err());
}

#[test]
fn rejects_limit_above_maximum() {
    assert!(Cli::try_parse_from(["tagpulse", "analyze", "travel", "--limit", "501"]).is_err());
}

#[test]
fn parses_search_case_sensitive() {
    let cli = Cli::try_parse_from(["tagpulse", "search", "travel", "Jeju", "--case-sensitive"])
        .unwrap();
    assert!(matches!(
        cli.command,
        Commands::Search { ref term, case_sensitive: true, .. } if term == "Jeju"
    ));
}

#[test]
fn search_defaults_to_case_insensitive() {
    let cli = Cli::try_parse_from(["tagpulse", "search", "travel", "jeju"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Search {
            case_sensitive: false,
            ..
        }
    ));
}

#[test]
fn parses_report_options() {
    let cli = Cli::try_parse_from(["tagpulse", "report", "travel", "--top", "5", "--json"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Report {
            top: 5,
            json: true,
            ..
        }
    ));
}

#[test]
fn parses_ask_question() {
    let cli = Cli::try_parse_from(["tagpulse", "ask", "travel", "바다 어때?"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Ask { ref question, .. } if question == "바다 어때?"
    ));
}

#[test]
fn parses_chat() {
    let cli = Cli::try_parse_from(["tagpulse", "chat", "travel"]).unwrap();
    assert!(matches!(cli.command, Commands::Chat { ref hashtag } if hashtag == "travel"));
}

#[test]
fn missing_command_is_an_error() {
    assert!(Cli::try_parse_from(["tagpulse"]).is_err());
}
