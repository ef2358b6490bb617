mod common;

use anyhow::Result;
use serde_json::{Value, json};
use std::sync::atomic::Ordering;
use std::time::Duration;

fn print_request(kind: &str) -> Value {
    json!({
        "type": kind,
        "nomorSurat": "001/SP/I/2024",
        "printedDate": "2024-01-31",
        "debitur": "Acme",
        "angsuranKe": "11",
        "idAplikasi": "APP-4",
        "uidCollection": "UID-APP-4",
        "angsuran": "500000",
        "totalOverdue": "750000",
        "debiturStatus": "Overdue",
        "peringatanLevel": "SP1",
    })
}

/// Re-hide runs after the response; poll until it lands
async fn wait_until_hidden(google: &common::FakeGoogle) -> bool {
    for _ in 0..50 {
        if google.state.is_form_hidden() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn test_root_not_ready_then_form() -> Result<()> {
    let google = common::start_fake_google().await?;
    let app = common::start_test_server(&google).await?;
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/", app.base_url)).send().await?;
    assert_eq!(res.status(), 503);
    assert_eq!(res.text().await?, "Please wait while data is loading...");

    let res = client
        .get(format!("{}/?forceReload=true", app.base_url))
        .send()
        .await?;
    assert!(res.status().is_success());
    let body = res.text().await?;
    assert!(body.contains("<option value=\"Acme\">Acme</option>"));
    assert!(body.contains("<option value=\"Budi\">Budi</option>"));
    assert!(!body.contains("Excavator Co"));
    Ok(())
}

#[tokio::test]
async fn test_debitur_detail() -> Result<()> {
    let google = common::start_fake_google().await?;
    let app = common::start_loaded_server(&google).await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/getDebiturData", app.base_url))
        .query(&[("name", "Acme")])
        .send()
        .await?;
    assert!(res.status().is_success());
    let detail: Value = res.json().await?;
    assert_eq!(detail["idAplikasi"], "APP-4");
    assert_eq!(detail["uidCollection"], "UID-APP-4");
    assert_eq!(detail["debiturStatus"], "Overdue");
    assert_eq!(detail["angsuranKe"], json!(["10", "11"]));
    assert_eq!(detail["overdueSekarang"], "");
    assert_eq!(detail["osPrincipal"], "12000000");

    let res = client
        .get(format!("{}/getDebiturData", app.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], "Debitur name is required");

    let res = client
        .get(format!("{}/getDebiturData", app.base_url))
        .query(&[("name", "Nobody")])
        .send()
        .await?;
    assert_eq!(res.status(), 404);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], "Debitur not found");
    Ok(())
}

#[tokio::test]
async fn test_debitur_table() -> Result<()> {
    let google = common::start_fake_google().await?;
    let app = common::start_loaded_server(&google).await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/getDebiturTableData", app.base_url))
        .query(&[("name", "Acme")])
        .send()
        .await?;
    assert!(res.status().is_success());
    let body: Value = res.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(
        body["data"],
        json!([
            ["10", "UID-APP-1", "500000", "750000", "12000000", 250000, "Current"],
            ["11", "UID-APP-4", "500000", "750000", "12000000", 0, "Overdue"],
        ])
    );

    let res = client
        .get(format!("{}/getDebiturTableData", app.base_url))
        .query(&[("name", "Budi")])
        .send()
        .await?;
    let body: Value = res.json().await?;
    assert_eq!(body["data"][0][5], 0);
    Ok(())
}

#[tokio::test]
async fn test_failed_refresh_keeps_serving() -> Result<()> {
    let google = common::start_fake_google().await?;
    let app = common::start_loaded_server(&google).await?;
    let client = reqwest::Client::new();

    google.state.fail_dataset.store(true, Ordering::SeqCst);
    google.state.set_dataset(vec![]);

    let res = client
        .get(format!("{}/?forceReload=true", app.base_url))
        .send()
        .await?;
    assert!(res.status().is_success());
    assert!(res.text().await?.contains("Acme"));

    let status: Value = client
        .get(format!("{}/status", app.base_url))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(status["dataset"]["ready"], true);
    assert_eq!(status["dataset"]["generation"], 1);
    assert_eq!(status["dataset"]["rows"], 4);
    assert_eq!(status["dataset"]["borrowers"], 3);
    assert!(status["dataset"]["last_failure"]["error"]
        .as_str()
        .unwrap()
        .contains("500"));
    assert_eq!(status["server"]["version"], "test");
    Ok(())
}

#[tokio::test]
async fn test_save_and_print() -> Result<()> {
    let google = common::start_fake_google().await?;
    *google.state.suffix.lock().unwrap() = Some("  Cabang   Jakarta ".to_string());
    google
        .state
        .log_rows
        .lock()
        .unwrap()
        .push(vec![json!(1), json!("customerCard")]);
    let app = common::start_loaded_server(&google).await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/saveAndPrint", app.base_url))
        .json(&print_request("suratPeringatan"))
        .send()
        .await?;
    assert!(res.status().is_success());
    let body: Value = res.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(
        body["pdfUrl"],
        format!("{}/file/d/file-1/view", google.base_url)
    );

    let log = google.state.log_rows.lock().unwrap().clone();
    assert_eq!(
        log[1],
        vec![
            json!(2),
            json!("suratPeringatan"),
            json!("SP1"),
            json!("APP-4"),
            json!("Acme"),
            json!("11"),
            json!("2024-01-31"),
            json!("001/SP/I/2024"),
            json!("Delivered"),
        ]
    );

    let exports = google.state.exports.lock().unwrap().clone();
    assert_eq!(exports.len(), 1);
    assert_eq!(exports[0]["range"], "B1:J63");
    assert_eq!(exports[0]["gid"], common::FORM_GID.to_string());
    assert_eq!(exports[0]["size"], "A4");

    let uploads = google.state.uploads.lock().unwrap().clone();
    assert_eq!(uploads.len(), 1);
    assert!(uploads[0].name.starts_with("SP_Acme_"));
    assert!(uploads[0].name.ends_with("_Cabang Jakarta.pdf"));
    assert_eq!(uploads[0].parents, vec![common::FOLDER_ID.to_string()]);
    assert_eq!(uploads[0].mime_type, "application/pdf");

    assert!(wait_until_hidden(&google).await);
    assert_eq!(*google.state.visibility_changes.lock().unwrap(), vec![false, true]);
    Ok(())
}

#[tokio::test]
async fn test_save_and_print_rejects_invalid_input_without_calls() -> Result<()> {
    let google = common::start_fake_google().await?;
    let app = common::start_loaded_server(&google).await?;
    let client = reqwest::Client::new();
    google.state.clear_requests();

    let res = client
        .post(format!("{}/saveAndPrint", app.base_url))
        .json(&print_request("bogus"))
        .send()
        .await?;
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], "Invalid type selected");

    let mut missing = print_request("customerCard");
    missing["nomorSurat"] = json!("");
    let res = client
        .post(format!("{}/saveAndPrint", app.base_url))
        .json(&missing)
        .send()
        .await?;
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], "Nomor Surat, Printed Date, and Debitur are required");

    let res = client
        .post(format!("{}/saveAndPrint", app.base_url))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(res.status(), 400);

    assert!(google.state.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_export_failure_rehides_and_keeps_log() -> Result<()> {
    let google = common::start_fake_google().await?;
    google.state.fail_export.store(true, Ordering::SeqCst);
    let app = common::start_loaded_server(&google).await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/saveAndPrint", app.base_url))
        .json(&print_request("reposition"))
        .send()
        .await?;
    assert_eq!(res.status(), 500);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], "Error saving or printing SP");

    assert!(google.state.is_form_hidden());
    assert_eq!(*google.state.visibility_changes.lock().unwrap(), vec![false, true]);
    assert_eq!(google.state.log_rows.lock().unwrap().len(), 1);
    assert!(google.state.uploads.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_status_before_first_load() -> Result<()> {
    let google = common::start_fake_google().await?;
    let app = common::start_test_server(&google).await?;

    let status: Value = reqwest::get(format!("{}/status", app.base_url))
        .await?
        .json()
        .await?;
    assert_eq!(status["dataset"]["ready"], false);
    assert_eq!(status["dataset"]["range"], "Dataset!A2:AB");
    assert!(status["dataset"].get("generation").is_none());
    assert_eq!(status["server"]["refresh_interval_seconds"], 3600);
    Ok(())
}

#[tokio::test]
async fn test_lookups_before_first_load() -> Result<()> {
    let google = common::start_fake_google().await?;
    let app = common::start_test_server(&google).await?;

    let res = reqwest::get(format!("{}/getDebiturData?name=Acme", app.base_url)).await?;
    assert_eq!(res.status(), 404);
    let res = reqwest::get(format!("{}/getDebiturTableData?name=Acme", app.base_url)).await?;
    assert_eq!(res.status(), 404);
    Ok(())
}
