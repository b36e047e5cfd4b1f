//! SARIF 2.1.0 output, for code-scanning integrations.

use indexmap::IndexSet;
use serde_json::json;

use crate::pipeline::FileReport;
use crate::violations::Severity;

fn sarif_level(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info | Severity::Style | Severity::Off => "note",
    }
}

pub fn render_sarif(reports: &[FileReport]) -> String {
    let mut rule_ids: IndexSet<&str> = IndexSet::new();
    for report in reports {
        for violation in &report.violations {
            rule_ids.insert(violation.code.as_str());
        }
    }

    let rules: Vec<serde_json::Value> = rule_ids
        .iter()
        .map(|id| {
            let mut rule = json!({ "id": id });
            if let Some(meta) = crate::rules::find(id).map(|r| r.metadata()) {
                rule["shortDescription"] = json!({ "text": meta.description });
                if let Some(url) = meta.doc_url {
                    rule["helpUri"] = json!(url);
                }
            }
            rule
        })
        .collect();

    let results: Vec<serde_json::Value> = reports
        .iter()
        .flat_map(|report| {
            report.violations.iter().map(|violation| {
                json!({
                    "ruleId": violation.code,
                    "level": sarif_level(violation.severity),
                    "message": { "text": violation.message },
                    "locations": [{
                        "physicalLocation": {
                            "artifactLocation": { "uri": report.path.display().to_string() },
                            "region": {
                                "startLine": violation.range.start_line,
                                "startColumn": violation.range.start_col + 1,
                                "endLine": violation.range.end_line,
                                "endColumn": violation.range.end_col + 1,
                            }
                        }
                    }]
                })
            })
        })
        .collect();

    let sarif = json!({
        "$schema": "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json",
        "version": "2.1.0",
        "runs": [{
            "tool": {
                "driver": {
                    "name": "tally",
                    "informationUri": "https://github.com/wharflab/tally",
                    "version": env!("CARGO_PKG_VERSION"),
                    "rules": rules,
                }
            },
            "results": results,
        }]
    });

    serde_json::to_string_pretty(&sarif).unwrap_or_else(|_| "{}".to_string())
}
