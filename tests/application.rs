use lifewire::prelude::*;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

type Events = Arc<Mutex<Vec<String>>>;

struct Logger {
    events: Events,
}

impl Logger {
    fn print(&self, message: impl Into<String>) {
        self.events.lock().unwrap().push(message.into());
    }
}

struct Handler;
struct Mux;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn timeout() -> Duration {
    Duration::from_secs(5)
}

fn events(events: &Events) -> Vec<String> {
    events.lock().unwrap().clone()
}

/// Logger, Handler(Logger), Mux(Logger) with one hook, and Register(Mux, Handler).
fn scenario(events: &Events, with_logger: bool) -> Application {
    let mut builder = Application::builder();

    if with_logger {
        let sink = Arc::clone(events);
        builder = builder.provide(Provider::new(move |()| {
            sink.lock().unwrap().push("Executing NewLogger.".into());
            Logger {
                events: Arc::clone(&sink),
            }
        }));
    }

    builder
        .provide(Provider::fallible(|(logger,): (Arc<Logger>,)| {
            logger.print("Executing NewHandler.");
            Ok::<_, anyhow::Error>(Handler)
        }))
        .provide(Provider::with_lifecycle(
            |(logger,): (Arc<Logger>,), lifecycle: &mut Lifecycle| {
                logger.print("Executing NewMux.");
                let on_start = Arc::clone(&logger);
                let on_stop = Arc::clone(&logger);
                lifecycle.append(
                    Hook::new("http-server")
                        .on_start(move |_| {
                            on_start.print("Starting HTTP server.");
                            async { Ok(()) }
                        })
                        .on_stop(move |_| {
                            on_stop.print("Stopping HTTP server.");
                            async { Ok(()) }
                        }),
                );
                Ok::<_, anyhow::Error>(Mux)
            },
        ))
        .invoke(Invocation::new(|(_mux, _handler): (Arc<Mux>, Arc<Handler>)| {}))
        .build()
        .unwrap()
}

#[tokio::test]
async fn logger_handler_mux_start_and_stop() {
    init_tracing();
    let log = Events::default();
    let mut app = scenario(&log, true);

    app.start(timeout()).await.unwrap();
    assert_eq!(app.state(), ContainerState::Running);
    app.stop(timeout()).await.unwrap();
    assert_eq!(app.state(), ContainerState::Stopped);

    assert_eq!(
        events(&log),
        vec![
            "Executing NewLogger.",
            "Executing NewMux.",
            "Executing NewHandler.",
            "Starting HTTP server.",
            "Stopping HTTP server.",
        ]
    );
}

#[tokio::test]
async fn missing_logger_fails_start_without_hooks() {
    init_tracing();
    let log = Events::default();
    let mut app = scenario(&log, false);

    let err = app.start(timeout()).await.unwrap_err();
    match err {
        LifewireError::UnknownType { ref type_name, .. } => {
            assert!(type_name.ends_with("Logger"), "{type_name}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(app.state(), ContainerState::FailedToStart);
    assert!(events(&log).is_empty());
}

fn mux_with_start_hook(started: &Arc<AtomicUsize>) -> Provider {
    let counter = Arc::clone(started);
    Provider::with_lifecycle(move |(), lifecycle: &mut Lifecycle| {
        let counter = Arc::clone(&counter);
        lifecycle.append(Hook::new("http-server").on_start(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        }));
        Ok::<_, anyhow::Error>(Mux)
    })
}

#[tokio::test]
async fn failing_invocation_fails_start_before_any_hook() {
    init_tracing();
    let started = Arc::new(AtomicUsize::new(0));

    let mut app = Application::builder()
        .provide(mux_with_start_hook(&started))
        .invoke(
            Invocation::fallible(|(_mux,): (Arc<Mux>,)| {
                Err::<(), _>(anyhow::anyhow!("route already mounted"))
            })
            .named("register"),
        )
        .build()
        .unwrap();

    let err = app.start(timeout()).await.unwrap_err();
    match err {
        LifewireError::InvocationFailed { ref invocation, .. } => {
            assert_eq!(invocation, "register");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(app.state(), ContainerState::FailedToStart);
    assert_eq!(started.load(Ordering::SeqCst), 0);
    assert_eq!(app.lifecycle_manager().hook_count(), 0);
}

#[tokio::test]
async fn failing_constructor_fails_start_before_any_hook() {
    init_tracing();
    let started = Arc::new(AtomicUsize::new(0));

    let mut app = Application::builder()
        .provide(mux_with_start_hook(&started))
        .provide(
            Provider::fallible(|(_mux,): (Arc<Mux>,)| {
                Err::<Handler, _>(anyhow::anyhow!("template missing"))
            })
            .named("new_handler"),
        )
        .invoke(Invocation::new(|(_mux, _handler): (Arc<Mux>, Arc<Handler>)| {}))
        .build()
        .unwrap();

    let err = app.start(timeout()).await.unwrap_err();
    match err {
        LifewireError::ConstructorFailed { ref provider, .. } => {
            assert_eq!(provider, "new_handler");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(app.state(), ContainerState::FailedToStart);
    assert_eq!(started.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn singleton_constructed_once_across_consumers() {
    init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let mut app = Application::builder()
        .provide(Provider::new(move |()| {
            counter.fetch_add(1, Ordering::SeqCst);
            Mux
        }))
        .provide(Provider::new(|(_mux,): (Arc<Mux>,)| Handler))
        .invoke(Invocation::new(|(_mux,): (Arc<Mux>,)| {}))
        .invoke(Invocation::new(|(_handler, _mux): (Arc<Handler>, Arc<Mux>)| {}))
        .build()
        .unwrap();

    app.start(timeout()).await.unwrap();
    let first = app.resolve::<Mux>().unwrap();
    let second = app.resolve::<Mux>().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    app.stop(timeout()).await.unwrap();
}

#[tokio::test]
async fn unused_provider_never_runs_or_appends_hooks() {
    init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let mut app = Application::builder()
        .provide(Provider::with_lifecycle(
            move |(), lifecycle: &mut Lifecycle| {
                counter.fetch_add(1, Ordering::SeqCst);
                lifecycle.append(Hook::new("unused"));
                Ok::<_, anyhow::Error>(Mux)
            },
        ))
        .supply(Handler)
        .invoke(Invocation::new(|(_handler,): (Arc<Handler>,)| {}))
        .build()
        .unwrap();

    app.start(timeout()).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(app.lifecycle_manager().hook_count(), 0);
    app.stop(timeout()).await.unwrap();
}

#[tokio::test]
async fn cycle_fails_start_and_constructs_nothing() {
    init_tracing();
    struct A;
    struct B;

    let calls = Arc::new(AtomicUsize::new(0));
    let (a_calls, b_calls) = (Arc::clone(&calls), Arc::clone(&calls));

    let mut app = Application::builder()
        .provide(Provider::new(move |(_b,): (Arc<B>,)| {
            a_calls.fetch_add(1, Ordering::SeqCst);
            A
        }))
        .provide(Provider::new(move |(_a,): (Arc<A>,)| {
            b_calls.fetch_add(1, Ordering::SeqCst);
            B
        }))
        .invoke(Invocation::new(|(_a,): (Arc<A>,)| {}))
        .build()
        .unwrap();

    assert!(matches!(
        app.container().validate(),
        Err(LifewireError::CyclicDependency { .. })
    ));

    let err = app.start(timeout()).await.unwrap_err();
    assert!(matches!(err, LifewireError::CyclicDependency { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

struct H1;
struct H2;
struct H3;
struct H4;

fn recording_hook(log: &Events, name: &'static str, failing: Option<&'static str>) -> Hook {
    let start_log = Arc::clone(log);
    let stop_log = Arc::clone(log);
    let fail = failing == Some(name);
    Hook::new(name)
        .on_start(move |_| {
            start_log.lock().unwrap().push(format!("start {name}"));
            async move {
                anyhow::ensure!(!fail, "{name} refused to start");
                Ok(())
            }
        })
        .on_stop(move |_| {
            stop_log.lock().unwrap().push(format!("stop {name}"));
            let fail = name == "h1";
            async move {
                anyhow::ensure!(!fail, "{name} failed to flush");
                Ok(())
            }
        })
}

/// Four constructors chained H1 <- H2 <- H3 <- H4, each appending one hook,
/// so hooks are appended in the order h1, h2, h3, h4.
fn chained_hooks(log: &Events, failing_start: Option<&'static str>) -> Application {
    let (l1, l2, l3, l4) = (
        Arc::clone(log),
        Arc::clone(log),
        Arc::clone(log),
        Arc::clone(log),
    );

    Application::builder()
        .provide(Provider::with_lifecycle(move |(), lc: &mut Lifecycle| {
            lc.append(recording_hook(&l1, "h1", failing_start));
            Ok::<_, anyhow::Error>(H1)
        }))
        .provide(Provider::with_lifecycle(
            move |(_h1,): (Arc<H1>,), lc: &mut Lifecycle| {
                lc.append(recording_hook(&l2, "h2", failing_start));
                Ok::<_, anyhow::Error>(H2)
            },
        ))
        .provide(Provider::with_lifecycle(
            move |(_h2,): (Arc<H2>,), lc: &mut Lifecycle| {
                lc.append(recording_hook(&l3, "h3", failing_start));
                Ok::<_, anyhow::Error>(H3)
            },
        ))
        .provide(Provider::with_lifecycle(
            move |(_h3,): (Arc<H3>,), lc: &mut Lifecycle| {
                lc.append(recording_hook(&l4, "h4", failing_start));
                Ok::<_, anyhow::Error>(H4)
            },
        ))
        .invoke(Invocation::new(|(_h4,): (Arc<H4>,)| {}))
        .build()
        .unwrap()
}

#[tokio::test]
async fn hooks_start_in_order_and_stop_in_reverse() {
    init_tracing();
    let log = Events::default();
    let mut app = chained_hooks(&log, None);

    app.start(timeout()).await.unwrap();
    let err = app.stop(timeout()).await.unwrap_err();

    // h1's OnStop fails, yet every other OnStop still ran.
    assert_eq!(err.errors().len(), 1);
    assert!(matches!(
        &err.errors()[0],
        LifewireError::StopHookFailed { hook, .. } if hook == "h1"
    ));
    assert_eq!(
        events(&log),
        vec![
            "start h1", "start h2", "start h3", "start h4", "stop h4", "stop h3", "stop h2",
            "stop h1",
        ]
    );
    assert_eq!(app.state(), ContainerState::Stopped);
}

#[tokio::test]
async fn failed_start_rolls_back_started_hooks() {
    init_tracing();
    let log = Events::default();
    let mut app = chained_hooks(&log, Some("h3"));

    let err = app.start(timeout()).await.unwrap_err();

    assert!(matches!(
        err,
        LifewireError::StartHookFailed { ref hook, .. } if hook == "h3"
    ));
    // h2 then h1 stopped exactly once; h1's rollback failure is ignored.
    assert_eq!(
        events(&log),
        vec!["start h1", "start h2", "start h3", "stop h2", "stop h1"]
    );
    assert_eq!(app.state(), ContainerState::FailedToStart);
}

#[tokio::test(start_paused = true)]
async fn zero_deadline_times_out_stuck_hook() {
    init_tracing();
    let mut app = Application::builder()
        .provide(Provider::with_lifecycle(|(), lc: &mut Lifecycle| {
            lc.append(Hook::new("stuck").on_start(|_| async {
                std::future::pending::<()>().await;
                Ok(())
            }));
            Ok::<_, anyhow::Error>(Mux)
        }))
        .invoke(Invocation::new(|(_mux,): (Arc<Mux>,)| {}))
        .build()
        .unwrap();

    let err = app.start(Duration::ZERO).await.unwrap_err();
    assert!(err.is_timeout(), "{err}");
    assert_eq!(app.state(), ContainerState::FailedToStart);
}

#[tokio::test(start_paused = true)]
async fn stop_timeout_is_collected_and_others_still_run() {
    init_tracing();
    let stopped = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&stopped);

    let mut app = Application::builder()
        .provide(Provider::multi(move |(), lc: &mut Lifecycle| {
            let counter = Arc::clone(&counter);
            lc.append(Hook::new("first").on_stop(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            }));
            lc.append(Hook::new("slow").on_stop(|deadline| async move {
                // Ignores the deadline and keeps going.
                tokio::time::sleep(deadline.timeout() * 2).await;
                Ok(())
            }));
            Ok::<_, anyhow::Error>((Mux, Handler))
        }))
        .invoke(Invocation::new(|(_handler,): (Arc<Handler>,)| {}))
        .build()
        .unwrap();

    app.start(timeout()).await.unwrap();
    let err = app.stop(Duration::from_millis(50)).await.unwrap_err();

    // "first" runs after the phase deadline but finishes at once, so only
    // the hook that overran is reported.
    assert_eq!(err.errors().len(), 1);
    assert!(matches!(
        &err.errors()[0],
        LifewireError::StopTimeout { hook, .. } if hook == "slow"
    ));
    assert_eq!(app.state(), ContainerState::Stopped);
    assert_eq!(stopped.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn optional_dependency_absent() {
    init_tracing();
    let seen = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);

    let mut app = Application::builder()
        .supply(Handler)
        .invoke(Invocation::new(
            move |(_handler, mux): (Arc<Handler>, Option<Arc<Mux>>)| {
                *sink.lock().unwrap() = Some(mux.is_some());
            },
        ))
        .build()
        .unwrap();

    app.start(timeout()).await.unwrap();
    assert_eq!(*seen.lock().unwrap(), Some(false));
    app.stop(timeout()).await.unwrap();
}

#[tokio::test]
async fn separate_applications_do_not_share_instances() {
    init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));

    let build = |calls: &Arc<AtomicUsize>| {
        let counter = Arc::clone(calls);
        Application::builder()
            .provide(Provider::new(move |()| {
                counter.fetch_add(1, Ordering::SeqCst);
                Mux
            }))
            .invoke(Invocation::new(|(_mux,): (Arc<Mux>,)| {}))
            .build()
            .unwrap()
    };

    let mut first = build(&calls);
    let mut second = build(&calls);
    assert_ne!(first.id(), second.id());

    first.start(timeout()).await.unwrap();
    second.start(timeout()).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    first.stop(timeout()).await.unwrap();
    second.stop(timeout()).await.unwrap();
}

#[tokio::test]
async fn duplicate_provider_fails_build() {
    init_tracing();
    let result = Application::builder()
        .provide(Provider::new(|()| Mux))
        .provide(Provider::multi(|(), _: &mut Lifecycle| {
            Ok::<_, anyhow::Error>((Handler, Mux))
        }))
        .build();

    assert!(matches!(
        result,
        Err(LifewireError::DuplicateProvider { .. })
    ));
}
