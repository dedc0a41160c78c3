//! Content type and language negotiation.

use failsafe_model::ApiError;

/// Plain JSON, always supported.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Request/response media types and languages the API can serve.
#[derive(Debug, Clone)]
pub struct ContentNegotiator {
    /// Supported media types in order of preference.
    supported: Vec<String>,
    languages: Vec<String>,
}

impl ContentNegotiator {
    /// Build a negotiator supporting plain JSON plus `primary_media_type`.
    #[must_use]
    pub fn new(primary_media_type: &str, languages: Vec<String>) -> Self {
        let mut supported = vec![JSON_MEDIA_TYPE.to_owned()];
        let primary = primary_media_type.to_ascii_lowercase();
        if primary != JSON_MEDIA_TYPE {
            supported.push(primary);
        }
        Self {
            supported,
            languages,
        }
    }

    #[must_use]
    pub fn supported_types(&self) -> &[String] {
        &self.supported
    }

    /// Pick the response media type.
    ///
    /// A `.json` path suffix wins, then the best `Accept` match; with no
    /// acceptable match plain JSON is used.
    #[must_use]
    pub fn best_match_content_type(&self, path_suffix: Option<&str>, accept: Option<&str>) -> String {
        if path_suffix == Some("json") {
            return JSON_MEDIA_TYPE.to_owned();
        }

        let Some(accept) = accept.filter(|a| !a.trim().is_empty()) else {
            return JSON_MEDIA_TYPE.to_owned();
        };
        let ranges = parse_accept(accept);

        let mut best: Option<(&String, f32)> = None;
        for offer in &self.supported {
            let Ok(offer_mime) = offer.parse::<mime::Mime>() else {
                continue;
            };
            let Some(quality) = media_quality(&ranges, &offer_mime) else {
                continue;
            };
            if quality > 0.0 && best.is_none_or(|(_, q)| quality > q) {
                best = Some((offer, quality));
            }
        }

        best.map_or_else(|| JSON_MEDIA_TYPE.to_owned(), |(offer, _)| offer.clone())
    }

    /// The declared request media type.
    ///
    /// An absent or empty header, and `text/plain`, count as unspecified.
    /// Anything else not in the supported set is a 415.
    pub fn get_content_type(&self, header: Option<&str>) -> Result<Option<String>, ApiError> {
        let Some(raw) = header.map(str::trim).filter(|h| !h.is_empty()) else {
            return Ok(None);
        };
        let essence = raw
            .parse::<mime::Mime>()
            .map(|m| m.essence_str().to_ascii_lowercase())
            .map_err(|_| ApiError::invalid_content_type(raw))?;

        if essence == mime::TEXT_PLAIN.essence_str() {
            return Ok(None);
        }
        if self.supported.iter().any(|s| *s == essence) {
            Ok(Some(essence))
        } else {
            Err(ApiError::invalid_content_type(&essence))
        }
    }

    /// Best available language for an `Accept-Language` header.
    ///
    /// A range matches a language exactly or by its primary subtag
    /// (`en-GB` matches `en`); `*` matches anything.
    #[must_use]
    pub fn best_match_language(&self, accept_language: Option<&str>) -> Option<String> {
        let header = accept_language?;
        let ranges: Vec<(String, f32)> = header
            .split(',')
            .filter_map(|part| {
                let mut pieces = part.split(';');
                let tag = pieces.next()?.trim().to_ascii_lowercase();
                if tag.is_empty() {
                    return None;
                }
                let quality = pieces
                    .find_map(|p| p.trim().strip_prefix("q=").map(str::to_owned))
                    .map_or(Some(1.0), |q| q.trim().parse::<f32>().ok())?;
                Some((tag, quality))
            })
            .collect();

        let mut best: Option<(&String, f32)> = None;
        for language in &self.languages {
            let lang = language.to_ascii_lowercase();
            let lang_primary = lang.split('-').next().unwrap_or_default();
            let quality = ranges
                .iter()
                .filter(|(tag, _)| {
                    tag == "*"
                        || *tag == lang
                        || tag.split('-').next() == Some(lang_primary)
                })
                .map(|(_, q)| *q)
                .reduce(f32::max);
            if let Some(quality) = quality.filter(|q| *q > 0.0) {
                if best.is_none_or(|(_, q)| quality > q) {
                    best = Some((language, quality));
                }
            }
        }
        best.map(|(language, _)| language.clone())
    }
}

fn parse_accept(accept: &str) -> Vec<mime::Mime> {
    accept
        .split(',')
        .filter_map(|part| part.trim().parse::<mime::Mime>().ok())
        .collect()
}

fn quality_of(range: &mime::Mime) -> f32 {
    range
        .get_param("q")
        .and_then(|q| q.as_str().parse::<f32>().ok())
        .unwrap_or(1.0)
}

/// Quality of the most specific range matching `offer`.
fn media_quality(ranges: &[mime::Mime], offer: &mime::Mime) -> Option<f32> {
    ranges
        .iter()
        .filter_map(|range| {
            let specificity = if range.type_() == mime::STAR {
                0
            } else if range.type_() != offer.type_() {
                return None;
            } else if range.subtype() == mime::STAR {
                1
            } else if range.subtype() == offer.subtype() && range.suffix() == offer.suffix() {
                2
            } else {
                return None;
            };
            Some((specificity, quality_of(range)))
        })
        .max_by_key(|(specificity, _)| *specificity)
        .map(|(_, quality)| quality)
}
