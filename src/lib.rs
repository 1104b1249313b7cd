//! The library code for `aetherview`, a headless model of the AetherView
//! blog's client side. The blog is a single shell page whose content
//! container is filled with HTML fragments, and the crate breaks the work
//! down into two cooperating components:
//!
//! 1. Routing ([`crate::router`]): turning link clicks and history entries
//!    into fragment loads, swapping the markup in and replaying its scripts
//! 2. Cataloguing ([`crate::catalog`]): loading the article collection and
//!    rendering filtered, sorted and paginated listings from it
//!
//! The two never call each other. The router announces each loaded page on a
//! typed lifecycle bus ([`crate::events`]) and the catalog reacts to it. A
//! [`crate::site::Site`] owns both for one document life, together with the
//! host they run against: a [`crate::document::Document`] standing in for
//! the DOM, a [`crate::fetch::Fetcher`] standing in for the network, and a
//! virtual clock for deferred work ([`crate::timers`]).
//!
//! The catalog itself is built from pure parts: the article store
//! ([`crate::article`]), the filter and sort engine ([`crate::filter`]),
//! pagination ([`crate::pagination`]) and the fragment builders
//! ([`crate::render`]).

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod article;
pub mod catalog;
pub mod config;
pub mod contact;
pub mod document;
pub mod events;
pub mod fetch;
pub mod filter;
pub mod pagination;
pub mod render;
pub mod router;
pub mod scripts;
pub mod site;
pub mod timers;
pub mod trending;
pub mod url;
