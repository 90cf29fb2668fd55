//! Tagged success/failure container shared by every step and saga.
//!
//! On the wire an outcome is `{"case": "Success"|"Failure", "success": ..,
//! "failure": ..}` with exactly one payload present. Records that disagree
//! with their own `case` are rejected while decoding.

use std::future::Future;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::fault::ProcessFailure;

/// Result of a unit of work: either a success value or a failure value.
///
/// Unlike [`std::result::Result`] this is plain business data. Infrastructure
/// errors travel in an outer `Result` around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<S, F> {
    Success(S),
    Failure(F),
}

/// Outcome of a process stage or of the whole process.
pub type ProcessResult<T> = Outcome<T, ProcessFailure>;

impl<S, F> Outcome<S, F> {
    pub fn success(value: S) -> Self {
        Outcome::Success(value)
    }

    pub fn failure(failure: F) -> Self {
        Outcome::Failure(failure)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    pub fn as_success(&self) -> Option<&S> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Failure(_) => None,
        }
    }

    pub fn as_failure(&self) -> Option<&F> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(failure) => Some(failure),
        }
    }

    pub fn map<T>(self, f: impl FnOnce(S) -> T) -> Outcome<T, F> {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Failure(failure) => Outcome::Failure(failure),
        }
    }

    pub fn map_failure<G>(self, f: impl FnOnce(F) -> G) -> Outcome<S, G> {
        match self {
            Outcome::Success(value) => Outcome::Success(value),
            Outcome::Failure(failure) => Outcome::Failure(f(failure)),
        }
    }

    pub fn into_result(self) -> Result<S, F> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(failure) => Err(failure),
        }
    }
}

impl<S, F> From<Result<S, F>> for Outcome<S, F> {
    fn from(result: Result<S, F>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(failure) => Outcome::Failure(failure),
        }
    }
}

/// Feeds a success into `continuation`; passes a failure (or an outer
/// error) through untouched without calling it.
///
/// Every composed pipeline is a chain of these calls, so a failing stage
/// is always the last stage that runs.
pub async fn short_circuit<S, T, F, E, C, Fut>(
    result: Result<Outcome<S, F>, E>,
    continuation: C,
) -> Result<Outcome<T, F>, E>
where
    C: FnOnce(S) -> Fut,
    Fut: Future<Output = Result<Outcome<T, F>, E>>,
{
    match result? {
        Outcome::Success(value) => continuation(value).await,
        Outcome::Failure(failure) => Ok(Outcome::Failure(failure)),
    }
}

#[derive(Serialize, Deserialize)]
enum Case {
    Success,
    Failure,
}

#[derive(Serialize)]
struct OutcomeRef<'a, S, F> {
    case: Case,
    #[serde(skip_serializing_if = "Option::is_none")]
    success: Option<&'a S>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<&'a F>,
}

/// `None` means the key is absent; a present `null` decodes as `Some`, so
/// `Success(())` and `Success(None)` survive a round trip.
#[derive(Deserialize)]
#[serde(bound(deserialize = "S: Deserialize<'de>, F: Deserialize<'de>"))]
struct OutcomeRepr<S, F> {
    case: Case,
    #[serde(default, deserialize_with = "present")]
    success: Option<S>,
    #[serde(default, deserialize_with = "present")]
    failure: Option<F>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl<S: Serialize, F: Serialize> Serialize for Outcome<S, F> {
    fn serialize<Z: Serializer>(&self, serializer: Z) -> Result<Z::Ok, Z::Error> {
        let repr = match self {
            Outcome::Success(value) => OutcomeRef {
                case: Case::Success,
                success: Some(value),
                failure: None,
            },
            Outcome::Failure(failure) => OutcomeRef {
                case: Case::Failure,
                success: None,
                failure: Some(failure),
            },
        };
        repr.serialize(serializer)
    }
}

impl<'de, S, F> Deserialize<'de> for Outcome<S, F>
where
    S: Deserialize<'de>,
    F: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = OutcomeRepr::<S, F>::deserialize(deserializer)?;
        match (repr.case, repr.success, repr.failure) {
            (Case::Success, Some(value), None) => Ok(Outcome::Success(value)),
            (Case::Failure, None, Some(failure)) => Ok(Outcome::Failure(failure)),
            (Case::Success, _, _) => Err(de::Error::custom(
                "outcome tagged Success must carry only a success payload",
            )),
            (Case::Failure, _, _) => Err(de::Error::custom(
                "outcome tagged Failure must carry only a failure payload",
            )),
        }
    }
}
