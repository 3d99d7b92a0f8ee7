use crate::{CONSENSUS_VERSION_HEADER, Error};
use reqwest::{Response, StatusCode};

pub trait ResponseOptional {
    fn optional(self) -> Result<Option<Response>, Error>;
}

impl ResponseOptional for Result<Response, Error> {
    fn optional(self) -> Result<Option<Response>, Error> {
        match self {
            Ok(x) => Ok(Some(x)),
            Err(e) if e.status() == Some(StatusCode::NOT_FOUND) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Trait for extracting the raw fork name from the headers of a response.
pub trait ResponseForkName {
    fn fork_name_from_header(&self) -> Result<Option<String>, Error>;
}

impl ResponseForkName for Response {
    fn fork_name_from_header(&self) -> Result<Option<String>, Error> {
        self.headers()
            .get(CONSENSUS_VERSION_HEADER)
            .map(|value| {
                value
                    .to_str()
                    .map(str::to_string)
                    .map_err(|e| Error::InvalidHeaders(format!("{}: {:?}", CONSENSUS_VERSION_HEADER, e)))
            })
            .transpose()
    }
}
