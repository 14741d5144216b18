use archive_search::compiler::compile;
use archive_search::query::{Query, ResolvedQuery};
use archive_search::ArchiveError;

fn full_query() -> Query {
    Query {
        terms: vec!["schnee".into(), "Post Hotel".into()],
        image_nr: Some(14826),
        decade: Some(1950),
        subjects: vec!["Wirtschaft".into(), "Handel".into()],
        author: Some("Steiner, Albert".into()),
    }
}

#[test]
fn test_free_text_round_trip() {
    let query = full_query();
    let text = query.to_canonical_search_text();

    assert_eq!(
        text,
        "dekade:1950 bildnr:14826 thema:Wirtschaft>Handel autor:\"Steiner, Albert\" schnee \"Post Hotel\""
    );
    assert_eq!(Query::parse_free_text(&text), Some(query));
}

#[test]
fn test_url_round_trip() {
    let query = full_query();
    let url = query.to_url();

    assert!(url.starts_with("?query=schnee,Post%20Hotel"));
    assert_eq!(Query::parse_url(&url).unwrap(), Some(query));
}

#[test]
fn test_url_round_trip_with_special_characters() {
    let query = Query {
        terms: vec!["zürich".into(), "a&b".into()],
        subjects: vec!["Wirtschaft, Handel".into()],
        ..Query::default()
    };

    let parsed = Query::parse_url(&query.to_url()).unwrap().unwrap();
    assert_eq!(parsed.terms, vec!["zürich", "a&b"]);
    assert_eq!(parsed.subjects, vec!["Wirtschaft, Handel"]);
}

#[test]
fn test_synonym_keys_give_equal_queries() {
    let a = Query::parse_free_text("dekade:1960 img:7 autor:Meier postauto").unwrap();
    let b = Query::parse_free_text("DEC:1960 bildnr:7 author:Meier postauto").unwrap();
    assert_eq!(a, b);

    let c = Query::parse_url("?dek=1960&image=7&author=Meier&query=postauto")
        .unwrap()
        .unwrap();
    assert_eq!(a, c);
}

#[test]
fn test_term_order_and_case_do_not_matter() {
    let a = Query::parse_free_text("Schnee post").unwrap();
    let b = Query::parse_free_text("POST schnee").unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_empty_inputs() {
    assert_eq!(Query::parse_free_text(""), None);
    assert_eq!(Query::parse_free_text("   "), None);
    assert_eq!(Query::parse_free_text("autor:\"\""), None);
    assert_eq!(Query::parse_url("").unwrap(), None);
    assert_eq!(Query::parse_url("?").unwrap(), None);
}

#[test]
fn test_malformed_url_is_format_error() {
    assert!(matches!(
        Query::parse_url("?dekade=neunzehnhundert"),
        Err(ArchiveError::Format(_))
    ));
    assert!(matches!(
        Query::parse_url("?query"),
        Err(ArchiveError::Format(_))
    ));
    assert!(matches!(
        Query::parse_url("?query=a=b"),
        Err(ArchiveError::Format(_))
    ));
}

#[test]
fn test_description() {
    let query = Query::parse_free_text("dec:1950 schnee post winter").unwrap();
    assert_eq!(
        query.to_description(),
        "\"schnee\", \"post\" und \"winter\" (Dekade: 1950)"
    );

    let query = Query::parse_free_text("dec:1950").unwrap();
    assert_eq!(query.to_description(), "Dekade: 1950");
}

#[test]
fn test_link_display_text() {
    let query = Query::parse_free_text("autor:\"Steiner, Albert\"").unwrap();
    assert_eq!(query.to_link_display_text(), "Steiner, Albert");

    let query = Query::parse_free_text("dec:1950 bildnr:7").unwrap();
    assert_eq!(query.to_link_display_text(), "dekade:1950 bildnr:7");
}

#[test]
fn test_compiled_query_from_free_text() {
    let query = Query::parse_free_text("dec:1950 bildnr:7 schnee").unwrap();
    let compiled = compile(&ResolvedQuery::unresolved(query));

    assert!(compiled
        .contains("?mainRes <http://api.dasch.swiss/ontology/0804/dokubib/v2#hasBildnummer> ?prop0 ."));
    assert!(compiled
        .contains("FILTER (?prop0Literal = \"7\"^^<http://www.w3.org/2001/XMLSchema#integer>) ."));
    assert!(compiled.contains("GREGORIAN:1950-01-01"));
    assert!(compiled.contains("\"schnee\"^^<http://www.w3.org/2001/XMLSchema#string>, \"i\""));
    assert!(compiled.ends_with("}\n"));
}
