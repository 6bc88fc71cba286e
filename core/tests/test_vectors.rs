//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and either the expected decoded record or the expected error text.
//! Decoded records are compared as typed values, not raw strings.

use extension_client::{
    ExtensionConfig, HttpMethod, HttpRequest, HttpResponse, ParameterOption, ParameterOutput,
    Parameters, SecretOption, SecretOutput, Secrets,
};

const PORT: u16 = 2773;

fn base_url() -> String {
    format!("http://localhost:{PORT}")
}

fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        other => panic!("unknown method: {other}"),
    }
}

fn pairs(value: &serde_json::Value) -> Vec<(String, String)> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|h| {
            let arr = h.as_array().unwrap();
            (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
        })
        .collect()
}

fn parameter_option(key: &str, value: &str) -> ParameterOption {
    match key {
        "version" => ParameterOption::Version(value.parse().unwrap()),
        "label" => ParameterOption::Label(value.to_string()),
        "withDecryption" => ParameterOption::WithDecryption,
        other => panic!("unknown parameter option: {other}"),
    }
}

fn secret_option(key: &str, value: &str) -> SecretOption {
    match key {
        "versionId" => SecretOption::VersionId(value.to_string()),
        "versionStage" => SecretOption::VersionStage(value.to_string()),
        other => panic!("unknown secret option: {other}"),
    }
}

fn check_request(name: &str, req: &HttpRequest, expected: &serde_json::Value) {
    assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
    assert_eq!(
        req.url,
        format!("{}{}", base_url(), expected["path"].as_str().unwrap()),
        "{name}: url"
    );
    assert_eq!(req.headers, pairs(&expected["headers"]), "{name}: headers");
}

fn simulated(case: &serde_json::Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse::new(
        sim["status"].as_u64().unwrap() as u16,
        sim["body"].as_str().unwrap(),
    )
}

fn check_error(name: &str, case: &serde_json::Value, err: &dyn std::error::Error) {
    let text = err.to_string();
    if let Some(expected) = case["expected_error"].as_str() {
        assert_eq!(text, expected, "{name}: error");
    } else if let Some(prefix) = case["expected_error_prefix"].as_str() {
        assert!(text.starts_with(prefix), "{name}: error {text:?}");
    } else {
        panic!("{name}: unexpected error {text}");
    }
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

#[test]
fn parameter_test_vectors() {
    let raw = include_str!("../../test-vectors/parameters.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();
    let token = vectors["token"].as_str().unwrap();
    let client = Parameters::new(ExtensionConfig::new(PORT, token));

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];
        let options: Vec<ParameterOption> = pairs(&input["options"])
            .iter()
            .map(|(k, v)| parameter_option(k, v))
            .collect();

        let req = client.build_get(input["name"].as_str().unwrap(), &options);
        check_request(name, &req, &case["expected_request"]);

        match client.parse_get(simulated(case)) {
            Ok(output) => {
                assert!(case.get("expected_result").is_some(), "{name}: expected an error");
                let expected: ParameterOutput =
                    serde_json::from_value(case["expected_result"].clone()).unwrap();
                assert_eq!(output, expected, "{name}: parsed result");
            }
            Err(err) => check_error(name, case, &err),
        }
    }
}

// ---------------------------------------------------------------------------
// Secrets
// ---------------------------------------------------------------------------

#[test]
fn secret_test_vectors() {
    let raw = include_str!("../../test-vectors/secrets.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();
    let token = vectors["token"].as_str().unwrap();
    let client = Secrets::new(ExtensionConfig::new(PORT, token));

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];
        let options: Vec<SecretOption> = pairs(&input["options"])
            .iter()
            .map(|(k, v)| secret_option(k, v))
            .collect();

        let req = client.build_get(input["secret_id"].as_str().unwrap(), &options);
        check_request(name, &req, &case["expected_request"]);

        match client.parse_get(simulated(case)) {
            Ok(output) => {
                assert!(case.get("expected_result").is_some(), "{name}: expected an error");
                let expected: SecretOutput =
                    serde_json::from_value(case["expected_result"].clone()).unwrap();
                assert_eq!(output, expected, "{name}: parsed result");
            }
            Err(err) => check_error(name, case, &err),
        }
    }
}
