use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use chrono::{DateTime, Utc};
use flashmob_collab::{NearbyQuery, Preferences, PreferencesUpdate, SessionDraft, DEFAULT_MAX_DISTANCE};
use flashmob_core::Coordinates;
use serde::{de::DeserializeOwned, Deserialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::errors::ServerError;

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginSchema {
    #[validate(length(max = 254))]
    pub email: String,
    #[validate(length(max = 128))]
    pub password: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterSchema {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 300))]
    pub address: String,
    #[validate(nested)]
    pub preferences: Option<PreferencesSchema>,
}

#[derive(Debug, Default, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PreferencesSchema {
    #[validate(length(max = 32))]
    pub subjects: Option<Vec<String>>,
    /// In miles
    pub max_distance: Option<f64>,
    #[validate(length(max = 64))]
    pub favorite_venues: Option<Vec<String>>,
}

impl PreferencesSchema {
    pub fn into_update(self) -> PreferencesUpdate {
        PreferencesUpdate {
            subjects: self.subjects,
            max_distance: self.max_distance,
            favorite_venues: self.favorite_venues,
        }
    }

    /// Preferences given at registration, with defaults for anything left out
    pub fn into_preferences(self) -> Preferences {
        Preferences {
            subjects: self.subjects.unwrap_or_default(),
            max_distance: self.max_distance.unwrap_or(DEFAULT_MAX_DISTANCE),
            favorite_venues: self.favorite_venues.unwrap_or_default(),
        }
    }
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddressSchema {
    #[validate(length(min = 1, max = 300))]
    pub address: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewSessionSchema {
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    #[validate(length(min = 1, max = 200))]
    pub topic: String,
    pub venue_id: String,
    #[validate(length(max = 200))]
    pub meeting_spot: Option<String>,
    pub start_time: DateTime<Utc>,
    /// In minutes, between 30 and 180
    pub duration: i32,
    /// Between 3 and 8, including the host
    pub max_participants: i32,
}

impl From<NewSessionSchema> for SessionDraft {
    fn from(value: NewSessionSchema) -> Self {
        SessionDraft {
            subject: value.subject,
            topic: value.topic,
            venue_id: value.venue_id,
            meeting_spot: value.meeting_spot,
            start_time: value.start_time,
            duration: value.duration,
            max_participants: value.max_participants,
        }
    }
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewMessageSchema {
    /// Trimmed, then 1 to 500 characters
    #[validate(length(max = 2000))]
    pub body: String,
}

/// Where to search around. The location of the caller is used when left out.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct NearbyParams {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// In miles
    pub radius: Option<f64>,
    /// Only sessions of this subject
    pub subject: Option<String>,
}

impl NearbyParams {
    pub fn point(&self) -> Result<Option<Coordinates>, ServerError> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng) => {
                Ok(Some(Coordinates::new(lat, lng)))
            }
            (None, None) => Ok(None),
            _ => Err(ServerError::InvalidQuery(
                "lat and lng must be given together, as valid degrees".to_string(),
            )),
        }
    }

    pub fn into_query(self) -> Result<NearbyQuery, ServerError> {
        Ok(NearbyQuery {
            point: self.point()?,
            radius: self.radius,
            subject: self.subject.filter(|s| !s.trim().is_empty()),
        })
    }
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|e| ServerError::InvalidBody(e.body_text()))?;

        extracted_json
            .0
            .validate()
            .map_err(|e| ServerError::InvalidBody(e.to_string()))?;

        Ok(Self(extracted_json.0))
    }
}
