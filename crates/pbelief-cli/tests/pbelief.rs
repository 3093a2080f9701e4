use pbelief_test::{CommandExt, tempfile, tool};
use pretty_assertions::assert_eq;

// Simple diamond: 1 -> 2, 1 -> 3, 2 -> 4, 3 -> 4; prior[1] = 1, edges 0.9.
const DIAMOND_POINT_CSV: &str = "1,0,0.9,0.9,0\n1,0,0,0,0.9\n1,0,0,0,0.9\n1,0,0,0,0\n";

#[test]
fn point_algebra_simple_diamond() {
    let output = tool!("pbelief")
        .args(["--algebra", "point"])
        .arg("--network")
        .arg("-")
        .write_stdin(DIAMOND_POINT_CSV)
        .captured_output()
        .unwrap();
    assert!(output.status.success(), "{:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let belief_4 = value["4"].as_f64().unwrap();
    assert!((belief_4 - 0.9639).abs() < 1e-3, "belief[4] = {belief_4}");
}

#[test]
fn interval_algebra_requires_probabilities_flag() {
    let network = tempfile("0,1\n0,0\n").unwrap();
    let output = tool!("pbelief")
        .args(["--algebra", "interval"])
        .arg("--network")
        .arg(network.path())
        .captured_output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn interval_algebra_simple_diamond() {
    let network = tempfile("0,1,1,0\n0,0,0,1\n0,0,0,1\n0,0,0,0\n").unwrap();
    let probabilities = tempfile(
        r#"{
            "nodes": {
                "1": {"lower": 1.0, "upper": 1.0},
                "2": {"lower": 1.0, "upper": 1.0},
                "3": {"lower": 1.0, "upper": 1.0},
                "4": {"lower": 1.0, "upper": 1.0}
            },
            "edges": {
                "(1,2)": {"lower": 0.8, "upper": 0.9},
                "(1,3)": {"lower": 0.8, "upper": 0.9},
                "(2,4)": {"lower": 0.8, "upper": 0.9},
                "(3,4)": {"lower": 0.8, "upper": 0.9}
            }
        }"#,
    )
    .unwrap();

    let output = tool!("pbelief")
        .args(["--algebra", "interval"])
        .arg("--network")
        .arg(network.path())
        .arg("--probabilities")
        .arg(probabilities.path())
        .captured_output()
        .unwrap();
    assert!(output.status.success(), "{:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let lo = value["4"]["lo"].as_f64().unwrap();
    let hi = value["4"]["hi"].as_f64().unwrap();
    assert!(lo <= hi);
    assert!(lo > 0.0 && hi <= 1.0);
}

#[test]
fn invalid_network_exits_nonzero() {
    let output = tool!("pbelief")
        .args(["--algebra", "point"])
        .arg("--network")
        .arg("-")
        .write_stdin("not,a,valid,matrix\n")
        .captured_output()
        .unwrap();
    assert!(!output.status.success());
}
