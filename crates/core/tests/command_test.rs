use courtcall_core::command::{parse, Command};
use pretty_assertions::assert_eq;
use rstest::rstest;

#[rstest]
#[case("1", Command::Join(vec![1]))]
#[case("1 2", Command::Join(vec![1, 2]))]
#[case("  12   7 ", Command::Join(vec![12, 7]))]
#[case("yes", Command::Yes)]
#[case("Y", Command::Yes)]
#[case(" YES ", Command::Yes)]
#[case("no", Command::No)]
#[case("n", Command::No)]
#[case("Maybe", Command::Maybe)]
#[case("cancel 3", Command::Cancel(3))]
#[case("CANCEL   14", Command::Cancel(14))]
#[case("matches", Command::ListMatches)]
#[case("STATUS", Command::Status)]
#[case("next", Command::Next)]
#[case("help", Command::Help)]
#[case("?", Command::Help)]
fn test_grammar(#[case] input: &str, #[case] expected: Command) {
    assert_eq!(parse(input), expected);
}

#[rstest]
#[case("rate Anna 5", "Anna", 5)]
#[case("RATE anna smith 3", "anna smith", 3)]
#[case("Rate  Bob   1", "Bob", 1)]
fn test_rate_keeps_name_case(#[case] input: &str, #[case] player: &str, #[case] score: u8) {
    assert_eq!(
        parse(input),
        Command::Rate {
            player: player.to_string(),
            score
        }
    );
}

#[rstest]
#[case("rate Anna 0")]
#[case("rate Anna 6")]
#[case("rate Anna great")]
#[case("rate 4")]
#[case("rate")]
fn test_rate_out_of_range_is_unknown(#[case] input: &str) {
    assert_eq!(parse(input), Command::Unknown);
}

#[test]
fn test_play_with_and_without_text() {
    assert_eq!(parse("PLAY"), Command::Play(String::new()));
    assert_eq!(
        parse("play Saturday morning please"),
        Command::Play("Saturday morning please".to_string())
    );
}

#[rstest]
#[case("lol sure")]
#[case("")]
#[case("   ")]
#[case("yes please")]
#[case("cancel")]
#[case("cancel tomorrow")]
#[case("players")]
#[case("99999999999")]
#[case("1 2 x")]
fn test_everything_else_is_unknown(#[case] input: &str) {
    assert_eq!(parse(input), Command::Unknown);
}

#[test]
fn test_command_names_for_logging() {
    assert_eq!(parse("1 2").name(), "join");
    assert_eq!(parse("?").name(), "help");
    assert_eq!(parse("lol sure").name(), "unknown");
}
