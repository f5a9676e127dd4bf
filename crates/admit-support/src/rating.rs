// SPDX-FileCopyrightText: 2026 Admit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client-side checks for the post-session rating.

use admit_core::{AdmitError, EndSessionRequest, Rating, SessionId, UserId};

/// Validates the star selection before any network call is made.
pub fn validate_selection(selected: Option<u8>) -> Result<Rating, AdmitError> {
    match selected {
        Some(stars) => Rating::new(stars),
        None => Err(AdmitError::RatingValidation(
            "no rating selected".to_string(),
        )),
    }
}

/// The `endSession` call carrying the rating.
pub fn rating_request(session_id: SessionId, ended_by: UserId, rating: Rating) -> EndSessionRequest {
    EndSessionRequest {
        session_id,
        ended_by,
        rating: Some(rating),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_selection_is_rejected() {
        assert!(matches!(
            validate_selection(None),
            Err(AdmitError::RatingValidation(_))
        ));
    }

    #[test]
    fn out_of_range_is_rejected() {
        for stars in [0, 6, 255] {
            assert!(validate_selection(Some(stars)).is_err(), "{stars}");
        }
    }

    #[test]
    fn valid_selection_builds_request() {
        let rating = validate_selection(Some(4)).unwrap();
        let request = rating_request(SessionId::from(99), UserId(42), rating);
        assert_eq!(request.rating.map(Rating::stars), Some(4));
        assert_eq!(request.ended_by, UserId(42));
    }
}
