use chrono::{Days, NaiveDate};

use super::{ContentDraft, GenerationRequest};

/// System prompt for the first stage. `{today}`, `{tomorrow}`, `{plus3}` and
/// `{plus7}` are filled in by [`content_system_prompt`].
const CONTENT_SYSTEM_TEMPLATE: &str = r#"
You are a travel planning assistant. Write natural, helpful travel recommendations.

Your answer has TWO parts:

1. NATURAL LANGUAGE - friendly, specific advice. Name flight routes and dates,
   hotels with their neighborhood, restaurants and attractions with location context.

2. LOOKUP_REQUIREMENTS - a final section starting with "LOOKUP_REQUIREMENTS:" that
   lists every item needing a live lookup, one per line:
   - FLIGHT: [name], origin: [IATA], destination: [IATA], departure: [date], return: [date or one-way], adults: [n], class: [ECONOMY/BUSINESS/FIRST]
   - HOTEL: [name], location: [city, country, district], check-in: [date], check-out: [date], guests: [n], rooms: [n]
   - PLACE: [name], location: [city, country, district], type: [Restaurant/Museum/Attraction/...]

DATES:
- Today is {today}. Use YYYY-MM-DD.
- Resolve relative dates ("tomorrow", "next week") against today.
- Without explicit dates use {tomorrow} to {plus3} for stays and {tomorrow} to {plus7} for round trips.

LOCATIONS:
- Always give city AND country, plus district when known: "Paris France 1st arrondissement".
"#;

const MARKUP_SYSTEM_PROMPT: &str = r#"
You are a structured data extraction assistant. Given travel prose and its
LOOKUP_REQUIREMENTS, mark up every entity inline and list it for lookup.

Return PURE JSON, no code fences:
{
  "markedText": "prose with inline tags",
  "places": [{"id", "name", "context", "type", "searchQuery"}],
  "hotels": [{"id", "name", "context", "location", "checkInDate", "checkOutDate", "guests", "rooms", "searchQuery"}],
  "transport": [{"id", "name", "type", "origin", "destination", "departureDate", "returnDate", "adults", "travelClass"}]
}

TAGS (wrap the EXACT words used in the prose):
<place id="le-meurice-1" context="Paris France 1st arrondissement" type="Restaurant">Le Meurice</place>
<hotel id="hotel-plaza-1" context="Paris France 8th arrondissement" dates="2026-01-24:2026-01-27">Hôtel Plaza Athénée</hotel>
<flight id="jfk-cdg-flight" route="JFK-CDG" dates="2026-01-24:2026-01-31" class="ECONOMY">JFK to Paris</flight>

RULES:
- ids are unique, lowercase, hyphenated, and identical in the tag and in its list entry.
- Never nest tags.
- Every LOOKUP_REQUIREMENTS item appears both as a tag and in exactly one list.
- searchQuery combines name, type and context.
- Items without dates do not go in hotels or transport.
"#;

pub fn content_system_prompt(today: NaiveDate) -> String {
    let plus = |days: u64| {
        today
            .checked_add_days(Days::new(days))
            .unwrap_or(today)
            .format("%Y-%m-%d")
            .to_string()
    };
    CONTENT_SYSTEM_TEMPLATE
        .replace("{today}", &today.format("%Y-%m-%d").to_string())
        .replace("{tomorrow}", &plus(1))
        .replace("{plus3}", &plus(3))
        .replace("{plus7}", &plus(7))
}

pub fn markup_system_prompt() -> &'static str {
    MARKUP_SYSTEM_PROMPT
}

/// User message for the first stage: the query plus any trip context.
pub fn build_content_prompt(request: &GenerationRequest) -> String {
    let mut prompt = request.query.trim().to_string();
    if let Some(context) = &request.context {
        if let Some(location) = &context.location {
            prompt.push_str(&format!("\nTrip location: {location}"));
        }
        match (context.start_date, context.end_date) {
            (Some(start), Some(end)) => prompt.push_str(&format!("\nTrip dates: {start} - {end}")),
            (Some(start), None) => prompt.push_str(&format!("\nTrip starts: {start}")),
            (None, Some(end)) => prompt.push_str(&format!("\nTrip ends: {end}")),
            (None, None) => {}
        }
    }
    prompt
}

/// User message for the markup stage.
pub fn build_markup_prompt(draft: &ContentDraft) -> String {
    format!("{}\n\n{}", draft.natural_language, draft.lookup_requirements)
}
