//! Integration tests for the pipeline.
//!
//! These tests run joined rows through extraction, normalization,
//! vectorization and similarity together.

use data_loader::{MovieRecord, RawMovie};
use pipeline::{ContentPipeline, PipelineConfig, PorterStemmer, Stemmer};

fn names(values: &[&str]) -> String {
    let entries: Vec<String> = values
        .iter()
        .map(|v| format!("{{\"id\": 1, \"name\": \"{}\"}}", v))
        .collect();
    format!("[{}]", entries.join(", "))
}

fn crew(director: &str) -> String {
    let producer = r#"{"job": "Producer", "name": "Some Producer"}"#;
    format!(r#"[{}, {{"job": "Director", "name": "{}"}}]"#, producer, director)
}

fn create_test_rows() -> Vec<RawMovie> {
    vec![
        RawMovie {
            movie_id: 1,
            title: "Star Raid".to_string(),
            overview: "Rebels fight an empire across the galaxy".to_string(),
            genres: names(&["Science Fiction", "Adventure"]),
            keywords: names(&["space", "war"]),
            cast: names(&["Ann Lee", "Bo Park", "Cy Diaz", "Dee Fox"]),
            crew: crew("Jo Stone"),
        },
        RawMovie {
            movie_id: 2,
            title: "Star Raid II".to_string(),
            overview: "The empire strikes the rebels across the galaxy".to_string(),
            genres: names(&["Science Fiction", "Adventure"]),
            keywords: names(&["space", "war", "sequel"]),
            cast: names(&["Ann Lee", "Bo Park"]),
            crew: crew("Jo Stone"),
        },
        RawMovie {
            movie_id: 3,
            title: "Paris Letters".to_string(),
            overview: "Two strangers fall in love by mail".to_string(),
            genres: names(&["Romance", "Drama"]),
            keywords: "{broken".to_string(),
            cast: names(&["Eve Moss"]),
            crew: "[]".to_string(),
        },
    ]
}

#[test]
fn test_full_pipeline_end_to_end() {
    let rows = create_test_rows();
    let output = ContentPipeline::default().run(&rows).unwrap();

    assert_eq!(output.catalog.len(), 3);
    assert_eq!(output.similarity.dim(), 3);
    assert_eq!(output.report.records, 3);
    assert_eq!(output.report.malformed_fields, 1);

    // The sequel is closer to the first film than the romance is
    let to_sequel = output.similarity.get(0, 1).unwrap();
    let to_romance = output.similarity.get(0, 2).unwrap();
    assert!(to_sequel > to_romance);

    // Names are squashed, lowercased and stemmed into single terms
    let stemmer = PorterStemmer::new();
    assert!(output.vocabulary.index_of(&stemmer.stem("annlee")).is_some());
    assert!(output.vocabulary.index_of(&stemmer.stem("jostone")).is_some());
    assert!(output.vocabulary.index_of("ann").is_none());
    // Fourth-billed cast member was cut
    assert!(output.vocabulary.index_of(&stemmer.stem("deefox")).is_none());
}

#[test]
fn test_pipeline_is_deterministic() {
    let rows = create_test_rows();
    let pipeline = ContentPipeline::default();

    let first = pipeline.run(&rows).unwrap();
    let second = pipeline.run(&rows).unwrap();

    assert_eq!(first.vocabulary, second.vocabulary);
    assert_eq!(first.vectors, second.vectors);
    assert_eq!(first.similarity, second.similarity);
    assert_eq!(first.catalog, second.catalog);
}

#[test]
fn test_vocabulary_bound_and_symmetry() {
    let records: Vec<MovieRecord> = (0..40)
        .map(|i| MovieRecord {
            id: i,
            title: format!("Movie {}", i),
            overview: (0..i).map(|w| format!("word{} ", w % 17)).collect(),
            keywords: vec![format!("topic{}", i % 5)],
            ..Default::default()
        })
        .collect();
    let pipeline = ContentPipeline::new(PipelineConfig::new().with_max_features(8));
    let output = pipeline.run_records(&records).unwrap();

    assert!(output.vocabulary.len() <= 8);
    assert!(output.vectors.iter().all(|v| v.dims() == output.vocabulary.len()));

    let n = output.similarity.dim();
    for i in 0..n {
        for j in 0..n {
            assert_eq!(output.similarity.get(i, j), output.similarity.get(j, i));
        }
        let self_similarity = output.similarity.get(i, i).unwrap();
        if output.vectors[i].is_zero() {
            assert_eq!(self_similarity, 0.0);
        } else {
            assert!((self_similarity - 1.0).abs() < 1e-6);
        }
    }
}
