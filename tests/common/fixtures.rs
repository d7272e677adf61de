//! API page fixtures and generators

use ergast_extract::Encoding;

/// Circuits page in JSON, two records, one page
pub const CIRCUITS_JSON: &str = r#"{"MRData": {
    "xmlns": "http://ergast.com/mrd/1.5",
    "series": "f1",
    "limit": "30",
    "offset": "0",
    "total": "2",
    "CircuitTable": {"Circuits": [
        {"circuitId": "albert_park",
         "url": "http://en.wikipedia.org/wiki/Melbourne_Grand_Prix_Circuit",
         "circuitName": "Albert Park Grand Prix Circuit",
         "Location": {"lat": "-37.8497", "long": "144.968",
                      "locality": "Melbourne", "country": "Australia"}},
        {"circuitId": "monza",
         "url": "http://en.wikipedia.org/wiki/Autodromo_Nazionale_Monza",
         "circuitName": "Autodromo Nazionale di Monza",
         "Location": {"lat": "45.6156", "long": "9.28111",
                      "locality": "Monza", "country": "Italy"}}
    ]}
}}"#;

/// Constructor ids on one generated page: `team_<season>_<n>` for `n` in `offset..end`
fn constructor_ids(season: Option<i32>, offset: u64, limit: u64, total: u64) -> Vec<String> {
    let end = (offset + limit).min(total);
    (offset..end)
        .map(|n| match season {
            Some(season) => format!("team_{season}_{n}"),
            None => format!("team_{n}"),
        })
        .collect()
}

/// One constructors page in the given encoding
///
/// Records are numbered by absolute position so tests can check ordering across pages.
pub fn constructors_page(
    encoding: Encoding,
    season: Option<i32>,
    offset: u64,
    limit: u64,
    total: u64,
) -> String {
    let ids = constructor_ids(season, offset, limit, total);
    match encoding {
        Encoding::Json => {
            let records: Vec<String> = ids
                .iter()
                .map(|id| {
                    format!(
                        r#"{{"constructorId": "{id}", "url": "http://example.com/{id}",
                            "name": "Team {id}", "nationality": "British"}}"#
                    )
                })
                .collect();
            format!(
                r#"{{"MRData": {{"limit": "{limit}", "offset": "{offset}", "total": "{total}",
                    "ConstructorTable": {{"Constructors": [{}]}}}}}}"#,
                records.join(",")
            )
        }
        Encoding::Xml => {
            let records: String = ids
                .iter()
                .map(|id| {
                    format!(
                        r#"<Constructor constructorId="{id}" url="http://example.com/{id}"><Name>Team {id}</Name><Nationality>British</Nationality></Constructor>"#
                    )
                })
                .collect();
            format!(
                r#"<?xml version="1.0" encoding="utf-8"?>
<MRData xmlns="http://ergast.com/mrd/1.5" series="f1" limit="{limit}" offset="{offset}" total="{total}"><ConstructorTable>{records}</ConstructorTable></MRData>"#
            )
        }
    }
}
