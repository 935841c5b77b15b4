//! Alert system for displaying error messages to users.
//!
//! Alerts are returned by htmx endpoints and swapped into the
//! `#alert-container` element rendered by [crate::html::base].

use maud::{Markup, html};

/// An alert message with its styling.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    Error { message: String, details: String },
    ErrorSimple { message: String },
}

impl Alert {
    pub fn into_html(self) -> Markup {
        let (container_style, message, details) = match self {
            Alert::Error { message, details } => (
                "text-red-800 border-red-300 bg-red-50 dark:bg-gray-800 \
                dark:text-red-400 dark:border-red-800",
                message,
                details,
            ),
            Alert::ErrorSimple { message } => (
                "text-red-800 border-red-300 bg-red-50 dark:bg-gray-800 \
                dark:text-red-400 dark:border-red-800",
                message,
                String::new(),
            ),
        };

        // Template adapted from https://flowbite.com/docs/components/alerts/
        html! {
            div
                role="alert"
                class={ "flex items-start p-4 mb-4 text-sm border rounded-lg shadow " (container_style) }
            {
                div class="flex-1"
                {
                    span class="font-medium" { (message) }

                    @if !details.is_empty() {
                        p class="mt-1" { (details) }
                    }
                }

                button
                    type="button"
                    aria-label="Close"
                    class="ms-3 font-bold"
                    onclick="this.closest('[role=alert]').remove()"
                {
                    "×"
                }
            }
        }
    }
}
