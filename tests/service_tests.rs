use pokemon_battle_predictor::config::AppConfig;
use pokemon_battle_predictor::features::FEATURE_COUNT;
use pokemon_battle_predictor::matrix::{compute_matrix, parse_id_list, write_csv};
use pokemon_battle_predictor::outcome::read_records;
use pokemon_battle_predictor::server::serve;
use pokemon_battle_predictor::{build_service, load_context};
use std::path::Path;
use std::sync::Arc;
use tempdir::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const ROSTER_CSV: &str = "\
#,Name,Type 1,Type 2,Total,HP,Attack,Defense,Sp. Atk,Sp. Def,Speed,Generation,Legendary
1,Bulbasaur,Grass,Poison,318,45,49,49,65,65,45,1,False
4,Charmander,Fire,,309,39,52,43,60,50,65,1,False
7,Squirtle,Water,,314,44,48,65,50,64,43,1,False
150,Mewtwo,Psychic,,680,106,110,90,154,90,130,1,True
";

/// One sigmoid unit that only looks at type effectiveness: sigmoid(4 * (eff - 1)).
fn effectiveness_model() -> String {
    let kernel: Vec<Vec<f32>> = (0..FEATURE_COUNT)
        .map(|i| vec![if i == FEATURE_COUNT - 1 { 4.0 } else { 0.0 }])
        .collect();
    serde_json::json!({
        "layers": [
            {"kernel": kernel, "bias": [-4.0], "activation": "sigmoid"}
        ]
    })
    .to_string()
}

fn write_fixture(dir: &Path) -> AppConfig {
    let roster_path = dir.join("pokemon.csv");
    let model_path = dir.join("model.json");
    std::fs::write(&roster_path, ROSTER_CSV).unwrap();
    std::fs::write(&model_path, effectiveness_model()).unwrap();
    AppConfig {
        roster_path,
        model_path,
        ..AppConfig::default()
    }
}

#[test]
fn loads_context_from_files() {
    let dir = TempDir::new("predictor").unwrap();
    let config = write_fixture(dir.path());
    let ctx = load_context(&config).unwrap();
    assert_eq!(ctx.roster().ids(), vec![1, 4, 7, 150]);

    // Fire into Water is 0.5, so the network leans towards Squirtle.
    let prediction = ctx.predict(4, 7).unwrap();
    assert!(prediction.score < 0.5);
    assert_eq!(prediction.winner_id, 7);
    assert_eq!(prediction.winner_name, "Squirtle");

    // Water into Fire is 2.0.
    let prediction = ctx.predict(7, 4).unwrap();
    assert!(prediction.score > 0.9);
    assert_eq!(prediction.winner_id, 7);

    // Psychic has no builtin row, so the matchup is neutral: sigmoid(0) = 0.5.
    let prediction = ctx.predict(150, 1).unwrap();
    assert!((prediction.score - 0.5).abs() < 1e-6);
    assert_eq!(prediction.winner_id, 1);
}

#[test]
fn custom_type_chart_replaces_builtin() {
    let dir = TempDir::new("predictor").unwrap();
    let mut config = write_fixture(dir.path());
    let chart_path = dir.path().join("chart.json");
    std::fs::write(&chart_path, r#"{"Psychic": {"Grass": 2.0}}"#).unwrap();
    config.type_chart_path = Some(chart_path);

    let ctx = load_context(&config).unwrap();
    assert_eq!(ctx.predict(150, 1).unwrap().winner_id, 150);
    // Fire vs Water is not in the replacement chart, so it is neutral.
    let features = ctx.features(4, 7).unwrap();
    assert_eq!(features.type_effectiveness(), 1.0);
}

#[test]
fn start_up_fails_on_bad_inputs() {
    let dir = TempDir::new("predictor").unwrap();
    let config = write_fixture(dir.path());

    let missing_model = AppConfig {
        model_path: dir.path().join("nope.json"),
        ..config.clone()
    };
    assert!(load_context(&missing_model).is_err());

    let narrow_model = dir.path().join("narrow.json");
    std::fs::write(
        &narrow_model,
        r#"{"layers": [{"kernel": [[1.0], [1.0]], "bias": [0.0], "activation": "sigmoid"}]}"#,
    )
    .unwrap();
    let narrow = AppConfig {
        model_path: narrow_model,
        ..config.clone()
    };
    assert!(load_context(&narrow).is_err());

    let missing_roster = AppConfig {
        roster_path: dir.path().join("nope.csv"),
        ..config.clone()
    };
    let err = load_context(&missing_roster).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to read roster"), "{err:#}");

    let bad_chart = dir.path().join("bad_chart.json");
    std::fs::write(&bad_chart, r#"{"Shadow": {}}"#).unwrap();
    let with_bad_chart = AppConfig {
        type_chart_path: Some(bad_chart),
        ..config.clone()
    };
    assert!(load_context(&with_bad_chart).is_err());

    let missing_chart = AppConfig {
        type_chart_path: Some(dir.path().join("nope_chart.json")),
        ..config.clone()
    };
    assert!(load_context(&missing_chart).is_err());

    let header_only = dir.path().join("empty.csv");
    std::fs::write(&header_only, ROSTER_CSV.lines().next().unwrap()).unwrap();
    let empty = AppConfig {
        roster_path: header_only,
        ..config
    };
    assert!(load_context(&empty).is_err());
}

#[test]
fn matrix_covers_every_ordered_pair() {
    let dir = TempDir::new("predictor").unwrap();
    let config = write_fixture(dir.path());
    let ctx = load_context(&config).unwrap();
    let ids = parse_id_list("4, 7,1").unwrap();

    let matrix = compute_matrix(&ctx, &ids).unwrap();
    assert_eq!(matrix.len(), 3);
    assert!(matrix.iter().all(|row| row.len() == 3));
    for (i, &a) in ids.iter().enumerate() {
        for (j, &b) in ids.iter().enumerate() {
            assert_eq!(matrix[i][j], ctx.score(a, b).unwrap());
        }
    }
    // Fire resists Fire, so Charmander is the underdog in its own mirror.
    assert!(matrix[0][0] < 0.5);
    // Grass/Poison mirror: 0.5 * 0.5 from the Grass row, Poison has no row.
    assert!((matrix[2][2] - 0.0474).abs() < 1e-3);

    let out = dir.path().join("matrix.csv");
    write_csv(&ids, &matrix, &out).unwrap();
    let csv = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "#,4,7,1");
    assert_eq!(lines.len(), 4);
    assert!(lines[1].starts_with("4,0.1192,"));
}

#[test]
fn matrix_rejects_unknown_ids() {
    let dir = TempDir::new("predictor").unwrap();
    let ctx = load_context(&write_fixture(dir.path())).unwrap();
    assert!(compute_matrix(&ctx, &[4, 9999]).is_err());
    assert!(parse_id_list("4,x").is_err());
    assert!(parse_id_list(" , ").is_err());
}

async fn post_raw(addr: std::net::SocketAddr, body: &str) -> String {
    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "POST /predict/ HTTP/1.1\r\nHost: {addr}\r\nContent-Type: application/json\r\n\
Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn serves_predictions_over_http() {
    let dir = TempDir::new("predictor").unwrap();
    let mut config = write_fixture(dir.path());
    let log_path = dir.path().join("logs").join("battles.ndjson");
    config.outcome_log_path = Some(log_path.clone());

    let service = Arc::new(build_service(&config).unwrap());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(serve(listener, service));

    let response = post_raw(addr, r#"{"first_pokemon": 4, "second_pokemon": 7}"#).await;
    assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
    assert!(response.contains("application/json"));
    assert!(response.ends_with(r#"{"winner_id":7,"winner_name":"Squirtle"}"#), "{response}");

    let response = post_raw(addr, r#"{"first_pokemon": -1, "second_pokemon": 7}"#).await;
    assert!(response.starts_with("HTTP/1.1 400 Bad Request"), "{response}");
    assert!(response.contains("Invalid Pokémon ID"));

    server.abort();

    let records = read_records(&log_path).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].first_pokemon, 4);
    assert_eq!(records[0].second_pokemon, 7);
    assert_eq!(records[0].winner, 7);
}

#[test]
fn bundled_sample_data_loads() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let config = AppConfig {
        roster_path: root.join("data/pokemon.csv"),
        model_path: root.join("data/pokemon_model.json"),
        ..AppConfig::default()
    };
    let ctx = load_context(&config).unwrap();
    assert_eq!(ctx.predict(4, 7).unwrap().winner_name, "Squirtle");
    let ids = ctx.roster().ids();
    let matrix = compute_matrix(&ctx, &ids).unwrap();
    assert!(matrix.iter().flatten().all(|p| (0.0..=1.0).contains(p)));
}
