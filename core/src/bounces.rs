//! Read-only bounce listing.

use crate::client::{parse_json, PostmarkClient};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Transport;
use crate::types::BounceList;

impl<T> PostmarkClient<T> {
    pub fn build_list_bounces(&self, offset: u32, count: u32) -> HttpRequest {
        self.build_bodyless(
            HttpMethod::Get,
            &format!("/bounces?offset={offset}&count={count}"),
        )
    }

    pub fn parse_list_bounces(&self, response: HttpResponse) -> Result<BounceList, ApiError> {
        parse_json(response)
    }
}

impl<T: Transport> PostmarkClient<T> {
    pub fn list_bounces(&self, offset: u32, count: u32) -> Result<BounceList, ApiError> {
        let response = self.dispatch(self.build_list_bounces(offset, count))?;
        self.parse_list_bounces(response)
    }
}
