use archive_search::justification::JustificationBuilder;
use archive_search::query::Query;

const LOREM: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do eiusmod tempor incididunt ut labore et dolore magna aliqua. Ut \n\
enim ad minim veniam, quis nostrud exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat. Duis aute irure dolor \n\
in reprehenderit in voluptate velit esse cillum dolore eu fugiat nulla pariatur. Excepteur sint occaecat cupidatat non proident, \n\
sunt in culpa qui officia deserunt mollit anim id est laborum.";

fn builder(context_length: usize) -> JustificationBuilder {
    JustificationBuilder {
        context_length,
        require_whitespace: true,
        respect_hard_break: true,
        match_style: "match".to_string(),
        hard_break_exceptions: Vec::new(),
    }
}

fn with_exception(context_length: usize) -> JustificationBuilder {
    JustificationBuilder {
        hard_break_exceptions: vec!["tur. Exc".to_string()],
        ..builder(context_length)
    }
}

#[test]
fn test_single_term_whole_text() {
    let query = Query::from_text("postauto");
    let markup = builder(40).justify_query(&query, "Vorpflug Postauto bei der Schneeräumung");
    assert_eq!(
        markup,
        "<div>Vorpflug <span style=\"match\">Postauto</span> bei der Schneeräumung</div>"
    );
}

#[test]
fn test_two_terms_in_one_block() {
    let query = Query {
        terms: vec!["post".into(), "hotel".into()],
        ..Query::default()
    };
    let text = "Neues Post-Hotel, Schweizerische Kreditanstalt (SKA), heute Boutiquen, Via Serlas, Flaggen (Fahnen) verschiedener Nationen,Parkierte Autos";

    assert_eq!(
        builder(40).justify_query(&query, text),
        "<div>Neues <span style=\"match\">Post</span>-<span style=\"match\">Hotel</span>, Schweizerische Kreditanstalt (SKA), heute...</div>"
    );
}

#[test]
fn test_ellipsis_at_start_sentence_end_after() {
    assert_eq!(
        builder(30).justify(&["commodo"], LOREM),
        "<div>...laboris nisi ut aliquip ex ea <span style=\"match\">commodo</span> consequat.</div>"
    );
}

#[test]
fn test_ellipses_on_both_sides() {
    assert_eq!(
        builder(10).justify(&["consectetur"], LOREM),
        "<div>...sit amet, <span style=\"match\">consectetur</span> adipiscing...</div>"
    );
}

#[test]
fn test_context_reaches_text_start() {
    assert_eq!(
        builder(40).justify(&["consectetur"], LOREM),
        "<div>Lorem ipsum dolor sit amet, <span style=\"match\">consectetur</span> adipiscing elit, sed do eiusmod tempor incididunt...</div>"
    );
}

#[test]
fn test_context_reaches_text_end() {
    assert_eq!(
        builder(15).justify(&["mollit"], LOREM),
        "<div>...officia deserunt <span style=\"match\">mollit</span> anim id est laborum.</div>"
    );
}

#[test]
fn test_preceding_sentence_end() {
    assert_eq!(
        builder(20).justify(&["occaecat"], LOREM),
        "<div>Excepteur sint <span style=\"match\">occaecat</span> cupidatat non proident,...</div>"
    );
}

#[test]
fn test_preceding_sentence_end_exception() {
    assert_eq!(
        with_exception(20).justify(&["occaecat"], LOREM),
        "<div>...pariatur. Excepteur sint <span style=\"match\">occaecat</span> cupidatat non proident,...</div>"
    );
}

#[test]
fn test_following_sentence_end() {
    assert_eq!(
        builder(20).justify(&["fugiat"], LOREM),
        "<div>...esse cillum dolore eu <span style=\"match\">fugiat</span> nulla pariatur.</div>"
    );
}

#[test]
fn test_following_sentence_end_exception() {
    assert_eq!(
        with_exception(20).justify(&["fugiat"], LOREM),
        "<div>...esse cillum dolore eu <span style=\"match\">fugiat</span> nulla pariatur. Excepteur...</div>"
    );
}

#[test]
fn test_separate_blocks_for_distant_matches() {
    let markup = builder(10).justify(&["lorem", "laborum"], LOREM);
    assert_eq!(markup.matches("<div>").count(), 2);
    assert!(markup.starts_with("<div><span style=\"match\">Lorem</span>"));
    assert!(markup.ends_with("<span style=\"match\">laborum</span>.</div>"));
}

#[test]
fn test_no_match_is_empty() {
    assert_eq!(builder(40).justify(&["schnee"], LOREM), "");
    assert_eq!(builder(40).justify::<&str>(&[], LOREM), "");
}
