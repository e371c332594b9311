use super::test_helpers::*;
use super::*;
use crate::types::{FetchOutcome, FileType, PostOutcome};
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
