//! End-to-end navigation tests on a headless host.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use spa_navigator::host::{ScriptRun, ScriptRunner};
use spa_navigator::navigation::{ErrorEvent, HookDecision, NavigationContext, NavigationError};
use spa_navigator::routing::RouteContext;
use spa_navigator::{LoaderFn, NavigateOptions, NavigationOutcome, RendererFn, RouteKind};

mod common;

use common::{page, Reply, TestHost};

fn user_route() -> RouteKind {
    RouteKind::loader(
        LoaderFn(|ctx: RouteContext| async move {
            Ok::<_, anyhow::Error>(json!({ "id": ctx.params["id"] }))
        }),
        RendererFn(|data: Option<Value>, _ctx: RouteContext| async move {
            let id = data
                .and_then(|d| d["id"].as_str().map(str::to_string))
                .unwrap_or_default();
            Ok::<_, anyhow::Error>(format!("<h1>User {id}</h1>"))
        }),
    )
}

fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

#[tokio::test]
async fn test_loader_route_renders_and_caches() {
    let host = TestHost::new(&page("Home", "<p>home</p>"));
    host.navigator.route("/user/:id", user_route()).unwrap();

    let outcome = host.navigator.navigate("/user/42", NavigateOptions::default()).await;

    assert_eq!(
        outcome,
        NavigationOutcome::Rendered {
            url: TestHost::url("/user/42"),
        }
    );
    assert!(host.container_html().contains("42"));
    assert_eq!(host.navigator.loader_cache().keys(), vec![TestHost::url("/user/42")]);
    assert_eq!(host.history.len(), 1);
    assert_eq!(host.history.current().unwrap().url, TestHost::url("/user/42"));
    assert!(host.transport.requests().is_empty(), "loader routes never fetch");
}

#[tokio::test]
async fn test_loader_memoized_per_url() {
    let host = TestHost::new(&page("Home", "<p>home</p>"));
    let loads = counter();
    let l = loads.clone();
    host.navigator
        .route(
            "/count/:n",
            RouteKind::loader(
                LoaderFn(move |ctx: RouteContext| {
                    let l = l.clone();
                    async move {
                        l.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, anyhow::Error>(json!(ctx.params["n"]))
                    }
                }),
                RendererFn(|data: Option<Value>, _ctx: RouteContext| async move {
                    Ok::<_, anyhow::Error>(format!("<p>{}</p>", data.unwrap_or_default()))
                }),
            ),
        )
        .unwrap();

    let opts = NavigateOptions::default();
    host.navigator.navigate("/count/1", opts).await;
    host.navigator.navigate("/count/2", opts).await;
    host.navigator.navigate("/count/1", opts).await;

    assert_eq!(loads.load(Ordering::SeqCst), 2);
    assert_eq!(host.navigator.loader_cache().len(), 2);
    assert_eq!(host.history.len(), 3);
}

#[tokio::test]
async fn test_unregistered_path_fetches_extracts_and_caches() {
    let host = TestHost::new(&page("Home", "<p>home</p>"));
    host.transport.reply(
        "/about",
        Reply::html(page("About us", "<section><h2>About</h2></section>")),
    );
    host.transport.reply("/other", Reply::html(page("Other", "<p>other</p>")));

    let outcome = host.navigator.navigate("/about", NavigateOptions::default()).await;
    assert!(outcome.is_rendered());
    assert_eq!(host.container_html(), "<section><h2>About</h2></section>");
    assert_eq!(host.window.title(), "About us");
    assert!(host.navigator.content_cache().contains(&TestHost::url("/about")));

    let request = &host.transport.requests()[0];
    assert_eq!(request.method, "GET");
    assert!(request
        .headers
        .contains(&("X-Requested-With".to_string(), "spa-navigator".to_string())));

    host.navigator.navigate("/other", NavigateOptions::default()).await;
    host.navigator.navigate("/about", NavigateOptions::default()).await;
    assert_eq!(host.transport.calls("/about"), 1, "second visit served from cache");
    assert_eq!(host.container_html(), "<section><h2>About</h2></section>");
}

#[tokio::test]
async fn test_cache_disabled_refetches() {
    let config = spa_navigator::NavigatorConfig {
        cache: false,
        ..Default::default()
    };
    let host = TestHost::with_config(config, &page("Home", "<p>home</p>"));
    host.transport.reply("/a", Reply::html(page("A", "<p>a</p>")));
    host.transport.reply("/b", Reply::html(page("B", "<p>b</p>")));

    for target in ["/a", "/b", "/a"] {
        host.navigator.navigate(target, NavigateOptions::default()).await;
    }
    assert_eq!(host.transport.calls("/a"), 2);
    assert!(host.navigator.content_cache().is_empty());
}

#[tokio::test]
async fn test_before_each_false_aborts_without_side_effects() {
    let host = TestHost::new(&page("Home", "<p>home</p>"));
    host.transport.reply("/about", Reply::html(page("About", "<p>about</p>")));
    host.navigator
        .hooks()
        .before_each(|_| async move { Ok(false) });

    let outcome = host.navigator.navigate("/about", NavigateOptions::default()).await;

    assert_eq!(outcome, NavigationOutcome::Aborted);
    assert!(host.transport.requests().is_empty());
    assert_eq!(host.container_html(), "<p>home</p>");
    assert!(host.history.is_empty());
    assert_eq!(host.navigator.location().as_str(), TestHost::url("/"));
}

#[tokio::test]
async fn test_transport_failure_reports_once_and_falls_back() {
    let host = TestHost::new(&page("Home", "<p>home</p>"));
    host.transport.reply("/broken", Reply::network_failure());

    let first = counter();
    let second = counter();
    for c in [first.clone(), second.clone()] {
        host.navigator.hooks().on_error(move |event: ErrorEvent| {
            let c = c.clone();
            async move {
                assert!(matches!(*event.error, NavigationError::Transport(_)));
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
    }

    let outcome = host.navigator.navigate("/broken", NavigateOptions::default()).await;

    let target = TestHost::url("/broken");
    assert_eq!(
        outcome,
        NavigationOutcome::Fallback {
            url: target.clone(),
        }
    );
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 1);
    assert_eq!(host.window.hard_navigations(), vec![target]);
    assert!(host.history.is_empty());
    assert_eq!(host.container_html(), "<p>home</p>");
}

#[tokio::test]
async fn test_error_status_falls_back() {
    let host = TestHost::new(&page("Home", "<p>home</p>"));
    host.transport.reply("/gone", Reply::status(410));

    let outcome = host.navigator.navigate("/gone", NavigateOptions::default()).await;
    assert_eq!(
        outcome,
        NavigationOutcome::Fallback {
            url: TestHost::url("/gone"),
        }
    );
}

#[tokio::test]
async fn test_navigate_to_current_location_is_noop() {
    let host = TestHost::new(&page("Home", "<p>home</p>"));
    let hooks_run = counter();
    let h = hooks_run.clone();
    host.navigator.hooks().before_each(move |_| {
        let h = h.clone();
        async move {
            h.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });

    for target in ["/", "https://app.test/", "./"] {
        let outcome = host.navigator.navigate(target, NavigateOptions::default()).await;
        assert_eq!(outcome, NavigationOutcome::Unchanged);
    }
    assert_eq!(hooks_run.load(Ordering::SeqCst), 0);
    assert!(host.transport.requests().is_empty());
    assert!(host.history.is_empty());
}

#[tokio::test]
async fn test_first_registered_route_wins() {
    let host = TestHost::new(&page("Home", "<p>home</p>"));
    host.navigator
        .route("/items/:id", RouteKind::Template("<p>first</p>".into()))
        .unwrap();
    host.navigator
        .route("/items/*", RouteKind::Template("<p>second</p>".into()))
        .unwrap();

    host.navigator.navigate("/items/1", NavigateOptions::default()).await;
    assert_eq!(host.container_html(), "<p>first</p>");
}

#[tokio::test]
async fn test_pipeline_runs_in_order() {
    let host = TestHost::new(&page("Home", "<p>home</p>"));
    let events = Arc::new(Mutex::new(Vec::new()));

    for name in ["before:1", "before:2"] {
        let e = events.clone();
        host.navigator.hooks().before_each(move |_| {
            let e = e.clone();
            async move {
                e.lock().push(name.to_string());
                Ok(())
            }
        });
    }
    for name in ["after:1", "after:2"] {
        let e = events.clone();
        let history = host.history.clone();
        host.navigator.hooks().after_each(move |_| {
            let e = e.clone();
            let history = history.clone();
            async move {
                assert_eq!(history.len(), 1, "afterEach runs after commit");
                e.lock().push(name.to_string());
                Ok(())
            }
        });
    }

    let (le, re) = (events.clone(), events.clone());
    host.navigator
        .route(
            "/ordered",
            RouteKind::loader(
                LoaderFn(move |_ctx: RouteContext| {
                    let le = le.clone();
                    async move {
                        le.lock().push("loader".to_string());
                        Ok::<_, anyhow::Error>(Value::Null)
                    }
                }),
                RendererFn(move |_data: Option<Value>, _ctx: RouteContext| {
                    let re = re.clone();
                    async move {
                        re.lock().push("render".to_string());
                        Ok::<_, anyhow::Error>("<p>ordered</p>".to_string())
                    }
                }),
            ),
        )
        .unwrap();

    host.navigator.navigate("/ordered", NavigateOptions::default()).await;
    assert_eq!(
        *events.lock(),
        vec!["before:1", "before:2", "loader", "render", "after:1", "after:2"]
    );
}

#[tokio::test]
async fn test_before_each_redirect() {
    let host = TestHost::new(&page("Home", "<p>home</p>"));
    host.transport.reply("/login", Reply::html(page("Login", "<form></form>")));
    host.navigator.hooks().before_each(|ctx: NavigationContext| async move {
        Ok(if ctx.path == "/secret" {
            HookDecision::Redirect("/login".into())
        } else {
            HookDecision::Continue
        })
    });

    let outcome = host.navigator.navigate("/secret", NavigateOptions::default()).await;
    assert_eq!(
        outcome,
        NavigationOutcome::Rendered {
            url: TestHost::url("/login"),
        }
    );
    assert_eq!(host.transport.calls("/secret"), 0);
    assert_eq!(host.window.title(), "Login");
}

#[tokio::test]
async fn test_endless_redirects_abort() {
    let host = TestHost::new(&page("Home", "<p>home</p>"));
    let errors = counter();
    host.navigator.hooks().before_each(|ctx: NavigationContext| async move {
        let next = if ctx.path == "/a" { "/b" } else { "/a" };
        Ok(HookDecision::Redirect(next.into()))
    });
    let e = errors.clone();
    host.navigator.hooks().on_error(move |event: ErrorEvent| {
        let e = e.clone();
        async move {
            assert!(matches!(*event.error, NavigationError::TooManyRedirects(_)));
            e.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });

    let outcome = host.navigator.navigate("/a", NavigateOptions::default()).await;
    assert_eq!(outcome, NavigationOutcome::Aborted);
    assert_eq!(errors.load(Ordering::SeqCst), 1);
    assert!(host.transport.requests().is_empty());
}

#[tokio::test]
async fn test_failing_after_hook_is_isolated() {
    let host = TestHost::new(&page("Home", "<p>home</p>"));
    host.navigator
        .route("/t", RouteKind::Template("<p>t</p>".into()))
        .unwrap();

    let ran = counter();
    let errors = counter();
    host.navigator
        .hooks()
        .after_each(|_| async move { Err(anyhow::anyhow!("analytics down")) });
    let r = ran.clone();
    host.navigator.hooks().after_each(move |_| {
        let r = r.clone();
        async move {
            r.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });
    let e = errors.clone();
    host.navigator.hooks().on_error(move |event: ErrorEvent| {
        let e = e.clone();
        async move {
            assert!(matches!(*event.error, NavigationError::AfterHook(_)));
            e.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });

    let outcome = host.navigator.navigate("/t", NavigateOptions::default()).await;
    assert!(outcome.is_rendered());
    assert_eq!(ran.load(Ordering::SeqCst), 1);
    assert_eq!(errors.load(Ordering::SeqCst), 1);
    assert!(host.window.hard_navigations().is_empty());
}

#[tokio::test]
async fn test_loader_failure_falls_back() {
    let host = TestHost::new(&page("Home", "<p>home</p>"));
    host.navigator
        .route(
            "/fragile",
            RouteKind::loader(
                LoaderFn(|_ctx: RouteContext| async move {
                    Err::<Value, _>(anyhow::anyhow!("backend unavailable"))
                }),
                RendererFn(|_data: Option<Value>, _ctx: RouteContext| async move {
                    Ok::<_, anyhow::Error>(String::new())
                }),
            ),
        )
        .unwrap();

    let outcome = host.navigator.navigate("/fragile", NavigateOptions::default()).await;
    assert_eq!(
        outcome,
        NavigationOutcome::Fallback {
            url: TestHost::url("/fragile"),
        }
    );
    assert!(host.navigator.loader_cache().is_empty());
    assert_eq!(host.container_html(), "<p>home</p>");
}

#[tokio::test]
async fn test_loading_marker_set_only_while_pipeline_runs() {
    let host = TestHost::new(&page("Home", "<p>home</p>"));
    let app = host.node("#app");
    let seen = Arc::new(Mutex::new(None));

    let surface = host.navigator.surface().clone();
    let s = seen.clone();
    host.navigator
        .route(
            "/busy",
            RouteKind::loader(
                LoaderFn(move |_ctx: RouteContext| {
                    let surface = surface.clone();
                    let s = s.clone();
                    async move {
                        *s.lock() = surface.lock().attribute(app, "aria-busy");
                        Ok::<_, anyhow::Error>(Value::Null)
                    }
                }),
                RendererFn(|_data: Option<Value>, _ctx: RouteContext| async move {
                    Ok::<_, anyhow::Error>("<p>done</p>".to_string())
                }),
            ),
        )
        .unwrap();

    host.navigator.navigate("/busy", NavigateOptions::default()).await;
    assert_eq!(seen.lock().as_deref(), Some("true"));
    assert_eq!(host.attribute(app, "aria-busy"), None);
}

#[tokio::test]
async fn test_replace_and_scroll_options() {
    let host = TestHost::new(&page("Home", "<p>home</p>"));
    host.navigator.route("/a", RouteKind::Template("<p>a</p>".into())).unwrap();
    host.navigator.route("/b", RouteKind::Template("<p>b</p>".into())).unwrap();

    host.navigator.navigate("/a", NavigateOptions::default()).await;
    host.navigator
        .navigate("/b", NavigateOptions::replace().without_scroll())
        .await;

    assert_eq!(host.history.len(), 1);
    assert_eq!(host.history.current().unwrap().url, TestHost::url("/b"));
    assert_eq!(host.window.scrolls(), vec![0]);
}

#[tokio::test]
async fn test_history_pop_restores_snapshot_without_network() {
    let host = TestHost::new(&page("Home", "<p>home</p>"));
    host.transport.reply("/a", Reply::html(page("A", "<p>a</p>")));
    host.transport.reply("/b", Reply::html(page("B", "<p>b</p>")));
    host.navigator.navigate("/a", NavigateOptions::default()).await;
    host.navigator.navigate("/b", NavigateOptions::default()).await;

    let entry = host.history.back().unwrap();
    let outcome = host
        .navigator
        .on_history_popped(&entry.url, Some(entry.clone()))
        .await;

    assert_eq!(
        outcome,
        NavigationOutcome::Rendered {
            url: TestHost::url("/a"),
        }
    );
    assert_eq!(host.container_html(), "<p>a</p>");
    assert_eq!(host.window.title(), "A");
    assert_eq!(host.navigator.location().as_str(), TestHost::url("/a"));
    assert_eq!(host.transport.calls("/a"), 1);
    assert_eq!(host.history.len(), 2, "restoring never writes history");
}

#[tokio::test]
async fn test_history_pop_without_snapshot_renavigates_in_place() {
    let host = TestHost::new(&page("Home", "<p>home</p>"));
    host.transport.reply("/a", Reply::html(page("A", "<p>a</p>")));
    host.transport.reply("/b", Reply::html(page("B", "<p>b</p>")));
    host.navigator.navigate("/a", NavigateOptions::default()).await;

    let outcome = host.navigator.on_history_popped("/b", None).await;
    assert_eq!(
        outcome,
        NavigationOutcome::Rendered {
            url: TestHost::url("/b"),
        }
    );
    assert_eq!(host.history.len(), 1);
    assert_eq!(host.history.current().unwrap().url, TestHost::url("/b"));
}

#[tokio::test]
async fn test_scripts_activate_once_across_patches_and_restores() {
    let host = TestHost::new(&page("Home", "<p>home</p>"));
    let body = "<p>widget</p><script>init()</script>";
    host.transport.reply("/s", Reply::html(page("S", body)));
    host.transport.reply("/t", Reply::html(page("T", body)));
    host.transport.reply(
        "/data",
        Reply::html(page("D", "<script type=\"application/json\">{}</script>")),
    );

    host.navigator.navigate("/s", NavigateOptions::default()).await;
    assert_eq!(host.scripts.runs(), vec![ScriptRun::Inline("init()".into())]);

    host.navigator.navigate("/t", NavigateOptions::default()).await;
    let entry = host.history.back().unwrap();
    let url = entry.url.clone();
    host.navigator.on_history_popped(&url, Some(entry)).await;
    assert_eq!(host.scripts.runs().len(), 1);

    host.navigator.navigate("/data", NavigateOptions::default()).await;
    assert_eq!(host.scripts.runs().len(), 1, "data blocks are not executed");
}

#[tokio::test]
async fn test_external_scripts_load_in_order() {
    let host = TestHost::new(&page("Home", "<p>home</p>"));
    host.transport.reply(
        "/ext",
        Reply::html(page(
            "Ext",
            "<script src=\"/one.js\"></script><div><script src=\"/two.js\"></script></div>",
        )),
    );

    host.navigator.navigate("/ext", NavigateOptions::default()).await;
    assert_eq!(
        host.scripts.runs(),
        vec![
            ScriptRun::External("/one.js".into()),
            ScriptRun::External("/two.js".into()),
        ]
    );
}

#[tokio::test]
async fn test_missing_container_falls_back() {
    let host = TestHost::new("<html><body><main>no container</main></body></html>");
    host.navigator.route("/x", RouteKind::Template("<p>x</p>".into())).unwrap();

    let outcome = host.navigator.navigate("/x", NavigateOptions::default()).await;
    assert_eq!(
        outcome,
        NavigationOutcome::Fallback {
            url: TestHost::url("/x"),
        }
    );
    assert!(host.history.is_empty());
}

#[tokio::test]
async fn test_newer_navigation_supersedes_older() {
    let host = TestHost::new(&page("Home", "<p>home</p>"));
    host.transport.reply(
        "/slow",
        Reply::html(page("Slow", "<p>slow</p>")).delayed(Duration::from_millis(100)),
    );
    host.transport.reply("/fast", Reply::html(page("Fast", "<p>fast</p>")));

    let (slow, fast) = tokio::join!(
        host.navigator.navigate("/slow", NavigateOptions::default()),
        host.navigator.navigate("/fast", NavigateOptions::default()),
    );

    assert_eq!(slow, NavigationOutcome::Superseded);
    assert_eq!(
        fast,
        NavigationOutcome::Rendered {
            url: TestHost::url("/fast"),
        }
    );
    assert_eq!(host.container_html(), "<p>fast</p>");
    assert_eq!(host.history.len(), 1);
    assert_eq!(host.navigator.location().as_str(), TestHost::url("/fast"));
    assert!(host.window.hard_navigations().is_empty());
}

/// Runs inline scripts at once and takes `delay` to load each external one.
struct SlowScripts {
    delay: Duration,
    loaded: AtomicUsize,
}

#[async_trait]
impl ScriptRunner for SlowScripts {
    async fn execute_inline(&self, _code: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn load_external(&self, _src: &str) -> anyhow::Result<()> {
        tokio::time::sleep(self.delay).await;
        self.loaded.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_navigation_superseded_while_scripts_load_records_nothing() {
    let scripts = Arc::new(SlowScripts {
        delay: Duration::from_millis(150),
        loaded: AtomicUsize::new(0),
    });
    let host = TestHost::with_script_runner(&page("Home", "<p>home</p>"), scripts.clone());
    host.transport.reply(
        "/ext",
        Reply::html(page("Ext", "<p>ext</p><script src=\"/app.js\"></script>")),
    );
    host.transport.reply("/fast", Reply::html(page("Fast", "<p>fast</p>")));
    let after = counter();
    let a = after.clone();
    host.navigator.hooks().after_each(move |_| {
        let a = a.clone();
        async move {
            a.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });

    let (ext, fast) = tokio::join!(
        host.navigator.navigate("/ext", NavigateOptions::default()),
        async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            host.navigator.navigate("/fast", NavigateOptions::default()).await
        },
    );

    assert_eq!(ext, NavigationOutcome::Superseded);
    assert_eq!(
        fast,
        NavigationOutcome::Rendered {
            url: TestHost::url("/fast"),
        }
    );
    assert_eq!(scripts.loaded.load(Ordering::SeqCst), 1);
    assert_eq!(host.container_html(), "<p>fast</p>");
    assert_eq!(host.navigator.location().as_str(), TestHost::url("/fast"));
    assert_eq!(host.navigator.title(), "Fast");
    assert_eq!(host.window.title(), "Fast");
    let entries = host.history.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].url, TestHost::url("/fast"));
    assert_eq!(entries[0].html, "<p>fast</p>");
    assert_eq!(after.load(Ordering::SeqCst), 1);
}

fn delayed_route(delay: Duration, html: &'static str) -> RouteKind {
    RouteKind::loader(
        LoaderFn(move |_ctx: RouteContext| async move {
            tokio::time::sleep(delay).await;
            Ok::<_, anyhow::Error>(Value::Null)
        }),
        RendererFn(move |_data: Option<Value>, _ctx: RouteContext| async move {
            Ok::<_, anyhow::Error>(html.to_string())
        }),
    )
}

#[tokio::test]
async fn test_superseded_pipeline_leaves_newer_loading_marker() {
    let host = TestHost::new(&page("Home", "<p>home</p>"));
    let app = host.node("#app");
    host.navigator
        .route("/a", delayed_route(Duration::from_millis(60), "<p>a</p>"))
        .unwrap();
    host.navigator
        .route("/b", delayed_route(Duration::from_millis(200), "<p>b</p>"))
        .unwrap();

    let (a, b, during) = tokio::join!(
        host.navigator.navigate("/a", NavigateOptions::default()),
        async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            host.navigator.navigate("/b", NavigateOptions::default()).await
        },
        async {
            tokio::time::sleep(Duration::from_millis(120)).await;
            host.attribute(app, "aria-busy")
        },
    );

    assert_eq!(a, NavigationOutcome::Superseded);
    assert!(b.is_rendered());
    assert_eq!(during.as_deref(), Some("true"), "/b still loading");
    assert_eq!(host.attribute(app, "aria-busy"), None);
    assert_eq!(host.container_html(), "<p>b</p>");
}
