use std::{
    fs,
    path::{Path, PathBuf},
};

use hashbrown::HashMap;

use collabnets::batch::{fold_slices, run_subfield};
use collabnets::common::{read_rows, write_rows, CENTRALIZATION};
use collabnets::config::{Settings, YearRange};
use collabnets::graph_io::{load_graph, node_link_path, save_graph, GEXF_EXT};
use collabnets::network::AuthorNode;
use collabnets::tables::{concat_csv, subfield_percentages, SubfieldCount};
use collabnets::{
    cumulative_centralization, load_records, stages, CentralizationTable, Error, Graph,
    MergePolicy, Result, SliceSource, Stowage, StoredSlices,
};

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("collabnets-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn graph_of(edges: &[(&str, &str)]) -> Graph {
    let mut g = Graph::new();
    for (a, b) in edges {
        g.set_edge(a, b, 1);
    }
    g
}

struct MapSlices(HashMap<(String, i32), Graph>);

impl SliceSource for MapSlices {
    fn slice(&mut self, subfield: &str, year: i32) -> Result<Graph> {
        self.0
            .get(&(subfield.to_string(), year))
            .cloned()
            .ok_or_else(|| Error::MissingInput(PathBuf::from(format!("{}_{}", subfield, year))))
    }
}

fn two_years() -> MapSlices {
    let mut m = HashMap::new();
    m.insert(("Software".to_string(), 1), graph_of(&[("A", "B")]));
    m.insert(("Software".to_string(), 2), graph_of(&[("A", "B"), ("B", "C")]));
    MapSlices(m)
}

#[test]
fn cumulative_graph_follows_policy() {
    let run = run_subfield(&mut two_years(), "Software", &[1, 2], MergePolicy::Overwrite);
    assert_eq!(run.cumulative.weight("A", "B"), Some(1));
    assert_eq!(run.cumulative.node_count(), 3);
    assert_eq!(run.scores[0], Some(0.0));
    assert!((run.scores[1].unwrap() - 1.0).abs() < 1e-12);

    let run = run_subfield(&mut two_years(), "Software", &[1, 2], MergePolicy::Additive);
    assert_eq!(run.cumulative.weight("A", "B"), Some(2));
    assert_eq!(run.cumulative.weight("B", "C"), Some(1));
}

#[test]
fn missing_year_keeps_previous_score() {
    let run = run_subfield(&mut two_years(), "Software", &[1, 2, 3], MergePolicy::Overwrite);
    assert_eq!(run.scores.len(), 3);
    assert_eq!(run.scores[2], run.scores[1]);

    let run = run_subfield(&mut two_years(), "HCI", &[1, 2], MergePolicy::Overwrite);
    assert_eq!(run.scores, vec![None, None]);
    assert!(run.cumulative.is_empty());
}

#[test]
fn table_rows_follow_subfield_order() {
    let subfields = vec!["HCI".to_string(), "Software".to_string()];
    let mut seen = Vec::new();
    let table = cumulative_centralization(
        &mut two_years(),
        &subfields,
        &[2, 1, 2],
        MergePolicy::Overwrite,
        |run| seen.push(run.cumulative.node_count()),
    );
    assert_eq!(seen, vec![0, 3]);
    assert_eq!(table.years(), &[1, 2]);
    assert_eq!(table.subfields().collect::<Vec<_>>(), vec!["HCI", "Software"]);
    assert_eq!(table.get("HCI", 1), None);
    assert_eq!(table.get("Software", 1), Some(0.0));
    assert_eq!(table.average("Software"), Some(0.5));
}

#[test]
fn table_csv_layout() {
    let dir = scratch("table");
    let mut table = CentralizationTable::new(&[2015, 2016]);
    table.push_row("Software", vec![None, Some(0.5)]);
    table.push_row("HCI", vec![Some(0.25), Some(0.75)]);
    let path = dir.join(CENTRALIZATION);
    table.write_csv(&path).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], ",2015,2016,Average");
    assert_eq!(lines[1], "Software,,0.5,0.5");
    assert_eq!(lines[2], "HCI,0.25,0.75,0.5");
    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn stored_graph_comes_back_equal() {
    let dir = scratch("graph-io");
    let mut g = Graph::new();
    g.upsert_node(AuthorNode::new("https://openalex.org/A1", "BR", "Human-Computer Interaction"));
    g.upsert_node(AuthorNode::new("A<2>", "Unknown", "Software & Tools"));
    g.upsert_node(AuthorNode::new("lonely", "US", "Software"));
    g.set_edge("https://openalex.org/A1", "A<2>", 4);
    let stem = dir.join("Human-Computer_Interaction_2020");
    save_graph(&stem, &g).unwrap();

    let back = load_graph(&stem).unwrap();
    assert!(back.nodes().eq(g.nodes()));
    assert!(back.edges().eq(g.edges()));

    let mut gexf = stem.into_os_string();
    gexf.push(GEXF_EXT);
    let xml = fs::read_to_string(gexf).unwrap();
    assert!(xml.contains(r#"id="A&lt;2&gt;""#));
    assert!(xml.contains(r#"weight="4""#));
    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn unreadable_graph_is_a_format_error() {
    let dir = scratch("bad-graph");
    let stem = dir.join("Software_2020");
    fs::write(node_link_path(&stem), b"not gzip at all").unwrap();
    assert!(load_graph(&stem).is_err());
    assert!(matches!(
        load_graph(&dir.join("Software_1999")),
        Err(Error::MissingInput(_))
    ));
    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn stored_slices_skip_missing_years() {
    let dir = scratch("stored");
    let stowage = Stowage::new(dir.to_str().unwrap()).unwrap();
    save_graph(&stowage.year_graph("Signal Processing", 2020), &graph_of(&[("A", "B")])).unwrap();
    save_graph(
        &stowage.year_graph("Signal Processing", 2022),
        &graph_of(&[("B", "C"), ("C", "D")]),
    )
    .unwrap();

    let mut slices = StoredSlices::new(&stowage);
    let full = fold_slices(&mut slices, "Signal Processing", &[2020, 2021, 2022], MergePolicy::Overwrite);
    assert_eq!(full.node_count(), 4);
    assert_eq!(full.edge_count(), 3);

    let run = run_subfield(&mut slices, "Signal Processing", &[2020, 2021, 2022], MergePolicy::Overwrite);
    assert_eq!(run.scores[0], run.scores[1]);
    assert!(run.scores[2].unwrap() > 0.0);
    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn percentages_add_up_per_country_year() {
    let row = |year: i32, id: &str, count: u64, cc: &str| SubfieldCount {
        publication_year: year,
        subfield_id: id.to_string(),
        subfield_display_name: format!("S{}", id),
        count,
        citation_count: count * 2,
        country_code: cc.to_string(),
    };
    let rows = vec![
        row(2020, "1702", 30, "BR"),
        row(2020, "1712", 10, "BR"),
        row(2021, "1702", 5, "BR"),
        row(2020, "1702", 7, "US"),
        row(2020, "1712", 0, "CN"),
    ];
    let shares = subfield_percentages(&rows);
    assert_eq!(shares[0].total, 40);
    assert_eq!(shares[0].percentage, Some(75.0));
    assert_eq!(shares[2].percentage, Some(100.0));
    assert_eq!(shares[4].percentage, None);

    let br_2020: f64 = shares
        .iter()
        .filter(|s| s.country_code == "BR" && s.publication_year == 2020)
        .filter_map(|s| s.percentage)
        .sum();
    assert!((br_2020 - 100.0).abs() < 1e-9);
}

#[test]
fn concat_unions_columns() {
    let dir = scratch("concat");
    let a = dir.join("a.csv");
    let b = dir.join("b.csv");
    fs::write(&a, "id,year\nW1,2020\nW2,2021\n").unwrap();
    fs::write(&b, "year,title\n2022,Graphs\n").unwrap();
    let out = dir.join("out.csv");

    let n = concat_csv(&[a, dir.join("missing.csv"), b], &out).unwrap();
    assert_eq!(n, 3);
    let text = fs::read_to_string(&out).unwrap();
    assert_eq!(text, "id,year,title\nW1,2020,\nW2,2021,\n,2022,Graphs\n");

    assert!(matches!(
        concat_csv(&[dir.join("nothing.csv")], &out),
        Err(Error::MissingInput(_))
    ));
    fs::remove_dir_all(dir).unwrap();
}

fn write_meta(path: &Path) {
    let mut w = csv::Writer::from_path(path).unwrap();
    w.write_record(["id", "publication_year", "subfield", "authorships"])
        .unwrap();
    let software = r#"{"id": "https://openalex.org/subfields/1712", "display_name": "Software"}"#;
    let rows = [
        ("W1", "2020", software, r#"[{"id": "A", "countries": ["BR"]}, {"id": "B", "countries": ["BR"]}]"#),
        ("W2", "2021", software, r#"[{"author": {"id": "B"}, "countries": ["BR"]}, {"id": "C", "countries": ["US"]}]"#),
        ("W3", "2021", software, "[{broken"),
        ("W4", "soon", software, "[]"),
    ];
    for (id, year, subfield, authorships) in rows {
        w.write_record([id, year, subfield, authorships]).unwrap();
    }
    w.flush().unwrap();
}

fn settings_for(root: &Path) -> Settings {
    let catalog = root.join("catalog.csv");
    fs::write(&catalog, "subfield_id,subfield_display_name\n1712,Software\n1709,Human-Computer Interaction\n")
        .unwrap();
    Settings {
        data_root: root.to_path_buf(),
        years: YearRange {
            start: 2020,
            end: 2021,
        },
        summary_years: YearRange {
            start: 2020,
            end: 2021,
        },
        countries: vec!["BR".to_string()],
        home_country: "BR".to_string(),
        field_id: 17,
        request_delay_ms: 0,
        summary_delay_ms: 0,
        email_file: root.join("email.json"),
        subfield_catalog: Some(catalog),
        merge_policy: MergePolicy::Overwrite,
        api_base: "http://localhost".to_string(),
    }
}

#[test]
fn records_load_and_skip_broken_rows() {
    let dir = scratch("records");
    let path = dir.join("br_publication_meta.csv");
    write_meta(&path);
    let loaded = load_records(&path).unwrap();
    assert_eq!(loaded.records.len(), 2);
    assert_eq!(loaded.skipped, 2);
    assert_eq!(loaded.records[1].authorships[0].author_id.as_deref(), Some("B"));
    assert_eq!(loaded.records[0].subfield, "Software");
    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn networks_then_centralization() {
    let dir = scratch("stages");
    let stowage = Stowage::new(dir.to_str().unwrap()).unwrap();
    let settings = settings_for(&dir);
    write_meta(&stowage.publication_meta("BR"));

    stages::build_networks(&stowage, &settings).unwrap();
    let y2020 = load_graph(&stowage.year_graph("Software", 2020)).unwrap();
    assert_eq!(y2020.weight("A", "B"), Some(1));
    let empty = load_graph(&stowage.year_graph("Human-Computer Interaction", 2021)).unwrap();
    assert!(empty.is_empty());

    stages::combine_networks(&stowage, &settings).unwrap();
    let full = load_graph(&stowage.full_graph("Software")).unwrap();
    assert_eq!(full.node_count(), 3);

    stages::centralization(&stowage, &settings, stages::SliceOrigin::Stored, false).unwrap();
    let text = fs::read_to_string(stowage.processed.join(CENTRALIZATION)).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], ",2020,2021,Average");
    assert_eq!(lines[1], "Software,0.0,1.0,0.5");
    assert_eq!(lines[2], "Human-Computer Interaction,,,");

    stages::centralization(&stowage, &settings, stages::SliceOrigin::Records, false).unwrap();
    let again = fs::read_to_string(stowage.processed.join(CENTRALIZATION)).unwrap();
    assert_eq!(again, text);
    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn percentages_stage_reads_combined_counts() {
    let dir = scratch("percent-stage");
    let stowage = Stowage::new(dir.to_str().unwrap()).unwrap();
    let settings = settings_for(&dir);
    let counts = vec![SubfieldCount {
        publication_year: 2020,
        subfield_id: "1712".to_string(),
        subfield_display_name: "Software".to_string(),
        count: 4,
        citation_count: 9,
        country_code: "BR".to_string(),
    }];
    write_rows(&stowage.country_counts("BR"), &counts).unwrap();

    stages::concat_counts(&stowage, &settings).unwrap();
    stages::write_subfield_percentages(&stowage).unwrap();
    let back: Vec<SubfieldCount> =
        read_rows(&stowage.raw_counts.join(collabnets::common::COMBINED_COUNTS)).unwrap();
    assert_eq!(back, counts);
    let text = fs::read_to_string(
        stowage
            .processed
            .join(collabnets::common::SUBFIELD_PERCENTAGES),
    )
    .unwrap();
    assert!(text.lines().nth(1).unwrap().ends_with(",4,100.0"));
    fs::remove_dir_all(dir).unwrap();
}
