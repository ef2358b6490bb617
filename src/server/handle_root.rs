// Root page handler - borrower selection and print form

use crate::error::ServiceError;
use crate::server::ServerState;
use crate::server::utils::{flag_enabled, html_escape};
use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RootParams {
    #[serde(rename = "forceReload")]
    force_reload: Option<String>,
}

pub async fn handle_root(
    State(state): State<ServerState>,
    Query(params): Query<RootParams>,
) -> Response {
    if flag_enabled(params.force_reload.as_deref()) {
        log::info!("[Server] Reload requested by client");
        state.loader.refresh().await;
    }

    match state.queries.list_borrowers() {
        Ok(names) => Html(render_form(&names, &state.config.version)).into_response(),
        Err(ServiceError::NotReady) => {
            let mut headers = HeaderMap::new();
            headers.insert(
                "Content-Type",
                HeaderValue::from_static("text/plain; charset=utf-8"),
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                headers,
                ServiceError::NotReady.to_string(),
            )
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}

const FORM_SCRIPT: &str = r#"
const $ = (id) => document.getElementById(id);
const show = (text) => { $("result").textContent = text; };

async function loadDebitur() {
  const name = $("debitur").value;
  $("angsuranKe").innerHTML = "";
  $("history").querySelector("tbody").innerHTML = "";
  if (!name) return;
  const q = "?name=" + encodeURIComponent(name);
  const detail = await fetch("/getDebiturData" + q).then((r) => r.json());
  if (detail.error) { show(detail.error); return; }
  for (const key of ["idAplikasi", "uidCollection", "angsuran", "totalOverdue", "debiturStatus"]) {
    $(key).value = detail[key] ?? "";
  }
  for (const label of detail.angsuranKe || []) {
    const opt = document.createElement("option");
    opt.value = opt.textContent = label;
    $("angsuranKe").appendChild(opt);
  }
  const table = await fetch("/getDebiturTableData" + q).then((r) => r.json());
  for (const row of table.data || []) {
    const tr = document.createElement("tr");
    for (const cell of row) {
      const td = document.createElement("td");
      td.textContent = cell ?? "";
      tr.appendChild(td);
    }
    $("history").querySelector("tbody").appendChild(tr);
  }
}

async function saveAndPrint(event) {
  event.preventDefault();
  const body = Object.fromEntries(new FormData($("print-form")).entries());
  show("Saving...");
  const res = await fetch("/saveAndPrint", {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify(body),
  }).then((r) => r.json());
  if (res.success) {
    show("Saved");
    window.open(res.pdfUrl, "_blank");
  } else {
    show(res.error || "Error saving or printing SP");
  }
}

$("debitur").addEventListener("change", loadDebitur);
$("print-form").addEventListener("submit", saveAndPrint);
"#;

/// Full HTML page; borrower names are escaped
pub fn render_form(names: &[String], version: &str) -> String {
    let mut page = String::new();

    page.push_str("<!DOCTYPE html>\n<html lang=\"id\">\n<head>\n");
    page.push_str("<meta charset=\"utf-8\">\n");
    page.push_str("<title>Cetak Surat Debitur</title>\n");
    page.push_str(
        "<style>body{font-family:sans-serif;margin:2em}label{display:block;margin-top:.6em}\
         table{border-collapse:collapse;margin-top:1em}td,th{border:1px solid #ccc;padding:.2em .5em}</style>\n",
    );
    page.push_str("</head>\n<body>\n");
    page.push_str("<h1>Cetak Surat Debitur</h1>\n");
    page.push_str("<form id=\"print-form\">\n");

    page.push_str("<label>Debitur <select id=\"debitur\" name=\"debitur\" required>\n");
    page.push_str("<option value=\"\">-- pilih debitur --</option>\n");
    for name in names {
        let escaped = html_escape(name);
        page.push_str(&format!("<option value=\"{0}\">{0}</option>\n", escaped));
    }
    page.push_str("</select></label>\n");

    page.push_str("<label>Jenis <select name=\"type\">\n");
    page.push_str("<option value=\"suratPeringatan\">Surat Peringatan</option>\n");
    page.push_str("<option value=\"customerCard\">Customer Card</option>\n");
    page.push_str("<option value=\"reposition\">Reposition</option>\n");
    page.push_str("</select></label>\n");
    page.push_str("<label>Peringatan <select name=\"peringatanLevel\">\n");
    for level in ["SP1", "SP2", "SP3"] {
        page.push_str(&format!("<option>{}</option>\n", level));
    }
    page.push_str("</select></label>\n");

    page.push_str("<label>Nomor Surat <input name=\"nomorSurat\" required></label>\n");
    page.push_str("<label>Printed Date <input type=\"date\" name=\"printedDate\" required></label>\n");
    page.push_str("<label>Angsuran Ke <select id=\"angsuranKe\" name=\"angsuranKe\"></select></label>\n");
    for (id, label) in [
        ("idAplikasi", "ID Aplikasi"),
        ("uidCollection", "UID Collection"),
        ("angsuran", "Angsuran"),
        ("totalOverdue", "Total Overdue"),
        ("debiturStatus", "Status"),
    ] {
        page.push_str(&format!(
            "<label>{1} <input id=\"{0}\" name=\"{0}\" readonly></label>\n",
            id, label
        ));
    }

    page.push_str("<p><button type=\"submit\">Save &amp; Print</button> <span id=\"result\"></span></p>\n");
    page.push_str("</form>\n");

    page.push_str("<table id=\"history\"><thead><tr>");
    for heading in [
        "Angsuran Ke",
        "UID Collection",
        "Angsuran",
        "Total Overdue",
        "OS Principal",
        "Overdue",
        "Status",
    ] {
        page.push_str(&format!("<th>{}</th>", heading));
    }
    page.push_str("</tr></thead><tbody></tbody></table>\n");

    page.push_str(&format!(
        "<footer><small>{} borrowers &middot; v{}</small></footer>\n",
        names.len(),
        html_escape(version)
    ));
    page.push_str("<script>");
    page.push_str(FORM_SCRIPT);
    page.push_str("</script>\n</body>\n</html>\n");
    page
}
