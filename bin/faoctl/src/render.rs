//! ---
//! fao_section: "05-networking-external-interfaces"
//! fao_subsection: "module"
//! fao_type: "source"
//! fao_scope: "code"
//! fao_description: "Plain-text rendering of daemon responses."
//! fao_version: "v0.1.0"
//! fao_owner: "tbd"
//! ---
use std::fmt::Write as _;

use serde_json::Value;

fn text<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("-")
}

fn number(value: &Value, key: &str) -> f64 {
    value.get(key).and_then(Value::as_f64).unwrap_or_default()
}

fn items(value: &Value) -> &[Value] {
    value.as_array().map(Vec::as_slice).unwrap_or_default()
}

pub fn insights(response: &Value) -> String {
    let mut out = String::new();
    for (index, item) in items(&response["insights"]).iter().enumerate() {
        let cost = &item["costBenefit"];
        let _ = writeln!(
            out,
            "insight-{index}  {}\n            cost ${:.0}  roi {:.2}x  payback {} months",
            text(item, "insight"),
            number(cost, "cost"),
            number(cost, "roi"),
            number(cost, "paybackPeriod"),
        );
    }
    if out.is_empty() {
        out.push_str("no insights returned\n");
    }
    out
}

pub fn inspection(result: &Value) -> String {
    let mut out = format!(
        "{} inspected {} ({}), battery {}%\n",
        text(result, "droneId"),
        text(result, "area"),
        text(result, "status"),
        number(result, "batteryRemaining"),
    );
    for finding in items(&result["findings"]) {
        let _ = writeln!(out, "  - {}", finding.as_str().unwrap_or_default());
    }
    out
}

pub fn fleet(drones: &Value) -> String {
    let mut out = String::new();
    for drone in items(drones) {
        let busy = drone.get("busy").and_then(Value::as_bool).unwrap_or(false);
        let _ = writeln!(
            out,
            "{:<10} {:<12} {:>3}%  {}",
            text(drone, "id"),
            text(drone, "type"),
            number(drone, "battery"),
            if busy { "busy" } else { "idle" },
        );
    }
    out
}

pub fn simulation(report: &Value) -> String {
    let mut out = format!(
        "{}h at {}x: {} units, {} defects, quality {:.1}%, efficiency {:.1}%, downtime {} min\n",
        number(report, "hours"),
        number(report, "speedFactor"),
        number(report, "unitsProduced"),
        number(report, "defects"),
        number(report, "qualityRate"),
        number(report, "efficiency"),
        number(report, "downtime"),
    );
    for bottleneck in items(&report["bottlenecks"]) {
        let _ = writeln!(out, "  ! {}", bottleneck.as_str().unwrap_or_default());
    }
    out
}

pub fn dashboard(config: &Value, drones: &Value, twin: &Value) -> String {
    let stats = &twin["statistics"];
    let mut out = String::from("Factory Optimization Dashboard\n==============================\n");
    let _ = writeln!(
        out,
        "twin v{}  efficiency {:.1}%  downtime {:.1}%  throughput {} u/h",
        number(twin, "version"),
        number(stats, "efficiency") * 100.0,
        number(stats, "downtime") * 100.0,
        number(stats, "throughput"),
    );
    let _ = writeln!(out, "AI model: {}", text(config, "aiModel"));
    out.push_str("\nCameras\n");
    for camera in items(&twin["cameras"]) {
        let _ = writeln!(out, "  {:<8} {} ({})", text(camera, "id"), text(camera, "location"), text(camera, "status"));
    }
    out.push_str("\nDrones\n");
    for line in fleet(drones).lines() {
        let _ = writeln!(out, "  {line}");
    }
    let recent = items(&twin["insights"]);
    if !recent.is_empty() {
        out.push_str("\nRecent insights\n");
        for insight in recent.iter().rev().take(5) {
            let _ = writeln!(out, "  [{}] {}", text(insight, "status"), text(insight, "text"));
        }
    }
    out
}
