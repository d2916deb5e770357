use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset};
use thermorelay_common::StatusView;

const PAGE_HEAD: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <meta http-equiv="refresh" content="30;url=/">
  <title>Thermorelay</title>
  <link rel="stylesheet" href="/static/style.css">
</head>
<body>
  <h1>Thermorelay</h1>
"#;

const PAGE_TAIL: &str = "</body>\n</html>\n";

pub fn render_status_page(view: &StatusView) -> String {
    let mut html = String::with_capacity(4_096);
    html.push_str(PAGE_HEAD);

    let state_class = if view.relay_on { "ok" } else { "muted" };
    let temperature = match view.current_temp {
        Some(temp) if view.sensor_valid => format!("{temp:.2} °C"),
        Some(temp) => format!("{temp:.2} °C <span class=\"err\">(stale)</span>"),
        None => "<span class=\"err\">no sensor</span>".to_string(),
    };
    let window_note = if view.window_wraps_midnight {
        " <span class=\"err\">(crosses midnight, never active)</span>"
    } else {
        ""
    };

    let _ = write!(
        html,
        r#"  <div class="card">
    <h2>Status</h2>
    <p>Relay: <strong class="{state_class}">{state}</strong></p>
    <p>Mode: <strong>{mode}</strong></p>
    <p>Temperature: {temperature}</p>
    <p>Operating window: {window} ({window_state}){window_note}</p>
    <p>Local time: {now} ({timezone})</p>
  </div>
"#,
        state = view.state,
        mode = view.mode,
        window = format_window(view),
        window_state = if view.window_active { "active" } else { "inactive" },
        now = format_local(Some(view.now_epoch), view.utc_offset_secs),
        timezone = view.timezone,
    );

    let current_run = if view.relay_on {
        format_duration(view.current_run_secs)
    } else {
        "-".to_string()
    };
    let _ = write!(
        html,
        r#"  <div class="card">
    <h2>Relay history</h2>
    <p>Last on: {last_on}</p>
    <p>Last off: {last_off}</p>
    <p>Last on period: {last_period}</p>
    <p>Current run: {current_run}</p>
  </div>
"#,
        last_on = format_local(view.last_on_epoch, view.utc_offset_secs),
        last_off = format_local(view.last_off_epoch, view.utc_offset_secs),
        last_period = format_duration(view.last_on_period_secs),
    );

    let relay_disabled = if view.mode == "MANUAL" { "" } else { " disabled" };
    let _ = write!(
        html,
        r#"  <div class="card">
    <h2>Control</h2>
    <form method="post" action="/mode/toggle"><button>Switch to {next_mode}</button></form>
    <form method="post" action="/relay/toggle"><button{relay_disabled}>Turn relay {next_relay}</button></form>
  </div>
"#,
        next_mode = if view.mode == "MANUAL" { "AUTO" } else { "MANUAL" },
        next_relay = if view.relay_on { "OFF" } else { "ON" },
    );

    let settings = &view.settings;
    let _ = write!(
        html,
        r#"  <div class="card">
    <h2>Settings</h2>
    <form method="post" action="/settings">
      <div class="row">
        <div><label>Target °C</label><input name="target_temp" type="number" step="0.1" value="{target:.1}"></div>
        <div><label>Hysteresis °C</label><input name="delta_temp" type="number" step="0.1" value="{delta:.1}"></div>
        <div><label>Frost protection °C</label><input name="frost_protection_temp" type="number" step="0.1" value="{frost:.1}"></div>
      </div>
      <div class="row">
        <div><label>Start hour</label><input name="start_hour" type="number" min="0" max="23" value="{start_hour}"></div>
        <div><label>Start minute</label><input name="start_min" type="number" min="0" max="59" value="{start_min}"></div>
        <div><label>End hour</label><input name="end_hour" type="number" min="0" max="23" value="{end_hour}"></div>
        <div><label>End minute</label><input name="end_min" type="number" min="0" max="59" value="{end_min}"></div>
      </div>
      <button>Save</button>
    </form>
  </div>
"#,
        target = settings.target_temp,
        delta = settings.delta_temp,
        frost = settings.frost_protection_temp,
        start_hour = settings.start_hour,
        start_min = settings.start_min,
        end_hour = settings.end_hour,
        end_min = settings.end_min,
    );

    let link_class = if view.mqtt_connected { "ok" } else { "err" };
    let _ = write!(
        html,
        r#"  <p class="muted">MQTT: <span class="{link_class}">{link}</span>, reconnects: {reconnects}</p>
"#,
        link = if view.mqtt_connected {
            "connected"
        } else {
            "disconnected"
        },
        reconnects = view.reconnects,
    );

    html.push_str(PAGE_TAIL);
    html
}

fn format_window(view: &StatusView) -> String {
    let s = &view.settings;
    format!(
        "{:02}:{:02}-{:02}:{:02}",
        s.start_hour, s.start_min, s.end_hour, s.end_min
    )
}

fn format_local(epoch: Option<i64>, utc_offset_secs: i32) -> String {
    let local = epoch.and_then(|epoch| {
        let offset = FixedOffset::east_opt(utc_offset_secs)?;
        DateTime::from_timestamp(epoch, 0).map(|utc| utc.with_timezone(&offset))
    });
    match local {
        Some(local) => local.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "never".to_string(),
    }
}

fn format_duration(secs: u64) -> String {
    let (hours, minutes, seconds) = (secs / 3_600, (secs % 3_600) / 60, secs % 60);
    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use thermorelay_common::Settings;

    use super::*;

    fn view() -> StatusView {
        StatusView {
            state: "ON",
            relay_on: true,
            mode: "AUTO",
            current_temp: Some(19.5),
            sensor_valid: true,
            settings: Settings::default(),
            window_active: true,
            window_wraps_midnight: false,
            last_on_epoch: Some(1_700_000_000),
            last_off_epoch: None,
            last_on_period_secs: 0,
            current_run_secs: 3_725,
            mqtt_connected: false,
            reconnects: 2,
            now_epoch: 1_700_003_725,
            utc_offset_secs: 3_600,
            timezone: "Europe/Berlin".to_string(),
        }
    }

    #[test]
    fn durations_read_naturally() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(75), "1m 15s");
        assert_eq!(format_duration(3_725), "1h 02m 05s");
    }

    #[test]
    fn local_times_apply_offset() {
        assert_eq!(
            format_local(Some(1_700_000_000), 3_600),
            "2023-11-14 23:13:20"
        );
        assert_eq!(format_local(None, 0), "never");
    }

    #[test]
    fn page_shows_state_and_settings() {
        let html = render_status_page(&view());

        assert!(html.contains("Relay: <strong class=\"ok\">ON</strong>"));
        assert!(html.contains("19.50 °C"));
        assert!(html.contains("06:00-22:00 (active)"));
        assert!(html.contains("Current run: 1h 02m 05s"));
        assert!(html.contains("name=\"target_temp\" type=\"number\" step=\"0.1\" value=\"21.0\""));
        assert!(html.contains("reconnects: 2"));
        assert!(html.contains("<button disabled>Turn relay OFF</button>"));
    }

    #[test]
    fn manual_mode_enables_relay_button() {
        let html = render_status_page(&StatusView {
            mode: "MANUAL",
            ..view()
        });

        assert!(html.contains("<button>Turn relay OFF</button>"));
        assert!(html.contains("Switch to AUTO"));
    }

    #[test]
    fn stale_and_missing_readings_are_flagged() {
        let stale = render_status_page(&StatusView {
            sensor_valid: false,
            ..view()
        });
        let missing = render_status_page(&StatusView {
            current_temp: None,
            sensor_valid: false,
            ..view()
        });

        assert!(stale.contains("(stale)"));
        assert!(missing.contains("no sensor"));
    }
}
