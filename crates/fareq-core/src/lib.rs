// SPDX-License-Identifier: MIT

//! fareq-core: grammar-based extraction of structured travel intent
//! (origin, destination, departure/return dates, flexibility) from
//! free-text flight-search queries.

pub mod airports;
pub mod chunk;
pub mod dates;
pub mod extract;
pub mod tags;

use chrono::{NaiveDate, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::airports::{AirportDirectory, DirectoryError};
use crate::chunk::{SpanLabel, SpanTree};
use crate::dates::DateError;
use crate::extract::{ExtractedEntities, ExtractionRules};
use crate::tags::{StopWords, TagError, Tagger};

#[derive(Error, Debug)]
pub enum SearchError {
    /// No departure date could be extracted. Departure is mandatory in the
    /// output schema and has no null representation, so this fails the
    /// whole request.
    #[error("query has no usable departure date")]
    MissingDepartureDate,
    #[error(transparent)]
    Date(#[from] DateError),
    #[error(transparent)]
    Tag(#[from] TagError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// The `response` object of the output record. Field order matters: it is
/// the wire key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteResponse {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub departure: i64,
    #[serde(rename = "return")]
    pub return_date: Option<i64>,
}

/// Final, immutable output record for one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedQuery {
    pub request: String,
    pub response: RouteResponse,
}

impl ResolvedQuery {
    /// The wire form: key order and field names are part of the protocol.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Orchestrates one extraction request: prepare and tag the raw text, run
/// the extractors, resolve locations, normalize dates, assemble the record.
/// Stateless per request; the grammar set and stop words are immutable
/// after construction, so a processor can be shared across threads.
pub struct QueryProcessor<T, D> {
    tagger: T,
    directory: D,
    rules: ExtractionRules,
    stop_words: StopWords,
}

impl<T, D> QueryProcessor<T, D>
where
    T: Tagger,
    D: AirportDirectory,
{
    pub fn new(tagger: T, directory: D) -> Self {
        Self {
            tagger,
            directory,
            rules: ExtractionRules::default(),
            stop_words: StopWords::english(),
        }
    }

    /// Processes with today's UTC date as the reference clock.
    pub fn process(&self, raw: &str) -> Result<ResolvedQuery, SearchError> {
        self.process_at(raw, Utc::now().date_naive())
    }

    /// Deterministic entry point: the reference clock is pinned to `today`.
    pub fn process_at(&self, raw: &str, today: NaiveDate) -> Result<ResolvedQuery, SearchError> {
        let entities = self.extract(raw)?;

        let origin = match entities.origin_text.as_deref() {
            Some(text) => airports::resolve(&self.directory, text)?,
            None => None,
        };
        let destination = match entities.destination_text.as_deref() {
            Some(text) => airports::resolve(&self.directory, text)?,
            None => None,
        };

        let departure_text = entities
            .departure_text
            .as_deref()
            .ok_or(SearchError::MissingDepartureDate)?;
        let departure = dates::to_epoch_millis(&dates::normalize(departure_text, today))?;

        // a malformed return date is recoverable: the field is optional
        let return_date = match entities.return_text.as_deref() {
            Some(text) => match dates::to_epoch_millis(&dates::normalize(text, today)) {
                Ok(millis) => Some(millis),
                Err(err) => {
                    warn!("discarding malformed return date {:?}: {}", text, err);
                    None
                }
            },
            None => None,
        };

        Ok(ResolvedQuery {
            request: raw.to_string(),
            response: RouteResponse {
                origin,
                destination,
                departure,
                return_date,
            },
        })
    }

    /// The intermediate entity record: extraction only, no resolution or
    /// normalization. Exactly one tagger call.
    pub fn extract(&self, raw: &str) -> Result<ExtractedEntities, SearchError> {
        let prepared = tags::prepare(raw, &self.stop_words);
        let sequence = self.tagger.tag(&prepared)?;

        let route_tree = chunk::parse(&sequence, &self.rules.route);
        warn_ambiguous(&route_tree, SpanLabel::Route);
        let (origin_text, destination_text) =
            extract::origin_destination(&route_tree, &self.rules);

        let dates_tree = chunk::parse(&sequence, &self.rules.dates);
        warn_ambiguous(&dates_tree, SpanLabel::TravelDates);
        let (departure_text, return_text) = extract::travel_dates(&dates_tree);

        let is_flexible = extract::is_flexible(&sequence, &self.rules);

        Ok(ExtractedEntities {
            origin_text,
            destination_text,
            departure_text,
            return_text,
            is_flexible,
        })
    }
}

/// The last-match-wins tie-break silently discards earlier candidates;
/// surface that here, at the collaborator boundary, never inside the
/// extraction logic itself.
fn warn_ambiguous(tree: &SpanTree, label: SpanLabel) {
    let count = tree.spans(label).count();
    if count > 1 {
        warn!(
            "query produced {} {:?} spans; keeping the last one",
            count, label
        );
    }
}
