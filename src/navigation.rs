//! The navigation bar shown at the top of every protected page.

use maud::{Markup, html};

use crate::{endpoints, html::APP_NAME};

/// A link in the navigation bar.
///
/// It will change appearance if `is_current` is set to
/// `true`. Only one link should be set as active at any one time.
#[derive(Clone)]
struct Link<'a> {
    url: &'a str,
    title: &'a str,
    is_current: bool,
}

impl Link<'_> {
    fn into_html(self) -> Markup {
        let style = if self.is_current {
            "block py-2 px-3 text-white bg-blue-700 rounded-sm md:bg-transparent
        md:text-blue-700 md:p-0 dark:text-white md:dark:text-blue-500"
        } else {
            "block py-2 px-3 text-gray-900 rounded-sm hover:bg-gray-100
        md:hover:bg-transparent md:border-0 md:hover:text-blue-700 md:p-0
        dark:text-white md:dark:hover:text-blue-500 dark:hover:bg-gray-700
        dark:hover:text-white md:dark:hover:bg-transparent"
        };

        html!(
            a
                href=(self.url)
                class=(style)
                aria-current=[self.is_current.then_some("page")]
            {
                (self.title)
            }
        )
    }
}

pub struct NavBar<'a> {
    links: Vec<Link<'a>>,
    user_name: Option<&'a str>,
}

impl<'a> NavBar<'a> {
    /// Get the navigation bar.
    ///
    /// If a link matches `active_endpoint`, then that link will be
    /// marked as active and displayed differently in the HTML.
    /// `user_name` is the display name of the logged in operator, if known.
    pub fn new(active_endpoint: &str, user_name: Option<&'a str>) -> NavBar<'a> {
        let links = vec![
            Link {
                url: endpoints::DASHBOARD_VIEW,
                title: "Dashboard",
                is_current: active_endpoint == endpoints::DASHBOARD_VIEW,
            },
            Link {
                url: endpoints::LOG_OUT,
                title: "Esci",
                is_current: false,
            },
        ];

        NavBar { links, user_name }
    }

    pub fn into_html(self) -> Markup {
        // Template adapted from https://flowbite.com/docs/components/navbar/#default-navbar
        html!(
            nav class="bg-white border-gray-200 dark:bg-gray-900"
            {
                div
                    class="max-w-screen-xl flex flex-wrap items-center justify-between mx-auto p-4"
                {
                    a
                        href=(endpoints::DASHBOARD_VIEW)
                        class="flex items-center space-x-3 rtl:space-x-reverse"
                    {
                        span
                            class="self-center text-2xl font-semibold whitespace-nowrap dark:text-white"
                        {
                            (APP_NAME)
                        }
                    }

                    div class="flex items-center gap-6"
                    {
                        @if let Some(user_name) = self.user_name {
                            span
                                id="user-name"
                                class="text-sm text-gray-500 dark:text-gray-400"
                            {
                                (user_name)
                            }
                        }

                        ul
                            class="font-medium flex flex-row gap-4 md:gap-8 rtl:space-x-reverse"
                        {
                            @for link in self.links {
                                li { (link.into_html()) }
                            }
                        }
                    }
                }
            }
        )
    }
}

#[cfg(test)]
mod nav_bar_tests {
    use scraper::{Html, Selector};

    use crate::{endpoints, navigation::NavBar};

    #[test]
    fn dashboard_link_is_active_on_dashboard() {
        let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW, None);

        for link in &nav_bar.links {
            assert_eq!(
                link.is_current,
                link.url == endpoints::DASHBOARD_VIEW,
                "unexpected active state for {}",
                link.url
            );
        }
    }

    #[test]
    fn no_link_is_active_elsewhere() {
        for endpoint in [endpoints::ROOT, endpoints::LOG_IN_VIEW, endpoints::LOG_OUT] {
            let nav_bar = NavBar::new(endpoint, None);

            assert!(
                nav_bar.links.iter().all(|link| !link.is_current),
                "no link should be active for {endpoint}"
            );
        }
    }

    #[test]
    fn shows_user_name_and_log_out_link() {
        let markup = NavBar::new(endpoints::DASHBOARD_VIEW, Some("Mario Rossi"))
            .into_html()
            .into_string();
        let html = Html::parse_fragment(&markup);

        let user_name = html
            .select(&Selector::parse("#user-name").unwrap())
            .next()
            .expect("No user name found");
        assert_eq!(user_name.text().collect::<String>(), "Mario Rossi");

        let log_out_selector = Selector::parse(&format!("a[href=\"{}\"]", endpoints::LOG_OUT)).unwrap();
        assert_eq!(html.select(&log_out_selector).count(), 1);
    }

    #[test]
    fn omits_user_name_when_unknown() {
        let markup = NavBar::new(endpoints::DASHBOARD_VIEW, None)
            .into_html()
            .into_string();
        let html = Html::parse_fragment(&markup);

        assert_eq!(html.select(&Selector::parse("#user-name").unwrap()).count(), 0);
    }
}
