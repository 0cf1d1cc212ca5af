//! Plain-text rendering of session state for the terminal.

use session_core::{overlay::MapOverlay, ViewState, INPUT_PLACEHOLDER, LOADING_LABEL};
use shared::{domain::Sender, protocol::ChatMessage};

pub fn sender_label(sender: Sender) -> &'static str {
    match sender {
        Sender::User => "you",
        Sender::Assistant => "float-chat",
    }
}

pub fn message(message: &ChatMessage) -> String {
    let mut out = format!(
        "[{}] {}: {}",
        message.display_time(),
        sender_label(message.sender),
        message.content
    );
    let actions = message.data_actions();
    if !actions.is_empty() {
        let labels: Vec<&str> = actions.iter().map(|action| action.label()).collect();
        out.push_str(&format!("\n    [{}]", labels.join("] [")));
    }
    out
}

pub fn transcript(messages: &[ChatMessage]) -> String {
    messages.iter().map(message).collect::<Vec<_>>().join("\n")
}

pub fn loading() -> String {
    format!("float-chat: {LOADING_LABEL}")
}

pub fn quick_queries(queries: &[&str]) -> String {
    let mut out = String::from("Quick Query Examples:");
    for (index, query) in queries.iter().enumerate() {
        out.push_str(&format!("\n  {}. {query}", index + 1));
    }
    out.push_str("\nUse /quick <n> to copy one into the input.");
    out
}

pub fn prompt_hint() -> String {
    format!("{INPUT_PLACEHOLDER}  (Enter to send, /help for commands)")
}

pub fn view_status(view: &ViewState) -> String {
    format!(
        "Map panel: {} | Theme: {}",
        if view.map_visible { "shown" } else { "hidden" },
        if view.theme.is_dark() { "dark" } else { "light" }
    )
}

pub fn overlay(overlay: &MapOverlay) -> String {
    let mut out = format!("== {} ==", overlay.title);
    let legend: Vec<String> = overlay
        .legend()
        .iter()
        .map(|(status, label)| format!("{label}: {}", overlay.markers_with(*status).count()))
        .collect();
    out.push_str(&format!("\nLegend  {}", legend.join(" | ")));
    for marker in &overlay.markers {
        out.push_str(&format!(
            "\n  Float {} - {}",
            marker.wmo_id,
            marker.status.legend()
        ));
    }
    for current in &overlay.currents {
        out.push_str(&format!("\n  Current {} {:.1} m/s", current.heading, current.speed_m_s));
    }
    out.push_str(&format!(
        "\nActive Query Results  Active Floats: {}  Recent Profiles: {}  BGC Data: {}",
        overlay.summary.active_floats, overlay.summary.recent_profiles, overlay.summary.bgc_floats
    ));
    out.push_str(&format!("\n{}  {}m depth", overlay.region, overlay.depth_m));
    out
}
