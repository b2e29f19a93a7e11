//! Plain-text rendering of gateway results and the selection snapshot.

use std::fmt::Write as _;

use country_client::SelectionSnapshot;
use shared::{domain::SmallCountry, error::StepError};

pub fn country_line(country: &SmallCountry) -> String {
    if country.borders.is_empty() {
        return format!("{}  {}", country.cca3, country.name);
    }
    let borders: Vec<&str> = country.borders.iter().map(|c| c.as_str()).collect();
    format!(
        "{}  {}  (borders: {})",
        country.cca3,
        country.name,
        borders.join(", ")
    )
}

pub fn country_list(countries: &[SmallCountry]) -> String {
    if countries.is_empty() {
        return "  (none)\n".to_string();
    }
    let mut out = String::new();
    for country in countries {
        let _ = writeln!(out, "  {}", country_line(country));
    }
    out
}

fn field(value: Option<impl ToString>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn step_section(out: &mut String, title: &str, list: &[SmallCountry], error: Option<&StepError>) {
    match error {
        // A failed step shows no options rather than the previous ones.
        Some(error) => {
            let _ = writeln!(out, "{title}: failed ({}): {}", error.code.as_str(), error.message);
        }
        None => {
            let _ = writeln!(out, "{title} ({}):", list.len());
            out.push_str(&country_list(list));
        }
    }
}

pub fn snapshot(snapshot: &SelectionSnapshot) -> String {
    let state = &snapshot.state;
    let mut out = String::new();
    let _ = writeln!(out, "region:  {}", field(state.region));
    let _ = writeln!(out, "country: {}", field(state.country.as_ref()));
    let _ = writeln!(out, "border:  {}", field(state.border.as_ref()));
    step_section(
        &mut out,
        "countries",
        &snapshot.countries,
        snapshot.countries_error.as_ref(),
    );
    step_section(
        &mut out,
        "borders",
        &snapshot.borders,
        snapshot.borders_error.as_ref(),
    );
    out
}
