//! Route table

/// Views reachable by path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Expenses,
    Dashboard,
}

/// Outcome of matching a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    Render(Route),
    Redirect(Route),
}

impl Route {
    pub const ALL: [Route; 3] = [Route::Login, Route::Expenses, Route::Dashboard];

    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Expenses => "/expenses",
            Route::Dashboard => "/dashboard",
        }
    }

    /// Match a path. The root and unknown paths redirect to the expense list.
    pub fn resolve(path: &str) -> Resolved {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');

        Route::ALL
            .into_iter()
            .find(|r| r.path() == trimmed)
            .map(Resolved::Render)
            .unwrap_or(Resolved::Redirect(Route::Expenses))
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_paths_render() {
        assert_eq!(Route::resolve("/login"), Resolved::Render(Route::Login));
        assert_eq!(Route::resolve("/expenses/"), Resolved::Render(Route::Expenses));
        assert_eq!(
            Route::resolve("/dashboard?tab=month"),
            Resolved::Render(Route::Dashboard)
        );
    }

    #[test]
    fn test_root_and_unknown_redirect() {
        for path in ["", "/", "/settings", "/settings/profile", "/nope"] {
            assert_eq!(
                Route::resolve(path),
                Resolved::Redirect(Route::Expenses),
                "{path}"
            );
        }
    }
}
