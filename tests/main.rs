use std::cell::Cell;
use std::rc::Rc;

use autotrack::{
	activate_tracking, clear_on_tag_dirtied, consume_tag, create_tag, current_revision, dirty_tag,
	memoize, set_on_tag_dirtied, tracked, tracked_struct, tracked_with, untracked, Cache, Error, Tracked,
	TrackedRecord,
};


use mock::Spy;
use mockall::predicate;

fn count_dirties() -> Rc<Cell<u32>> {
	let count = Rc::new(Cell::new(0));
	set_on_tag_dirtied({
		let count = count.clone();
		move || {
			count.set(count.get() + 1);
			Ok(())
		}
	});
	count
}

#[test]
fn dirty_advances_clock_by_one() {
	let a = create_tag();
	let b = create_tag();
	let start = current_revision();
	assert_eq!(a.revision(), start);

	dirty_tag(&a).unwrap();
	assert_eq!(current_revision().get(), start.get() + 1);
	assert_eq!(a.revision(), current_revision());

	dirty_tag(&b).unwrap();
	dirty_tag(&b).unwrap();
	assert_eq!(current_revision().get(), start.get() + 3);
	assert_eq!(b.revision(), current_revision());
	assert!(a.revision() < b.revision());
}

#[test]
fn consume_outside_computation_is_noop() {
	let tag = create_tag();
	let revision = tag.revision();
	consume_tag(&tag);
	assert_eq!(tag.revision(), revision);
	assert!(!autotrack::is_tracking());
}

#[test]
fn cache_runs_once_until_dirty() {
	let tag = create_tag();
	let calls = Rc::new(Cell::new(0));

	let cache = Cache::new({
		let tag = tag.clone();
		let calls = calls.clone();
		move |()| {
			calls.set(calls.get() + 1);
			consume_tag(&tag);
			"v1"
		}
	});

	assert_eq!(cache.value(), "v1");
	assert_eq!(cache.value(), "v1");
	assert_eq!(calls.get(), 1);

	dirty_tag(&tag).unwrap();
	assert!(!cache.is_valid());
	assert_eq!(calls.get(), 1);

	assert_eq!(cache.value(), "v1");
	assert_eq!(calls.get(), 2);
	assert_eq!(cache.revision(), tag.revision());
}

#[test]
fn cache_passes_arguments_only_when_recomputing() {
	let tag = create_tag();
	let results = Rc::new(Cell::new(0));

	let cache = Cache::new({
		let tag = tag.clone();
		let results = results.clone();
		move |arg: &'static str| {
			tag.consume();
			results.set(results.get() + 1);
			format!("{}-{}", arg, results.get())
		}
	});

	assert_eq!(cache.execute("FOO"), "FOO-1");
	assert_eq!(cache.execute("BAR"), "FOO-1");
	tag.dirty().unwrap();
	assert_eq!(cache.execute("BAZ"), "BAZ-2");
}

#[test]
fn cache_ignores_unrelated_tags() {
	let read = create_tag();
	let unrelated = create_tag();
	let calls = Rc::new(Cell::new(0));

	let cache = Cache::new({
		let read = read.clone();
		let calls = calls.clone();
		move |()| {
			calls.set(calls.get() + 1);
			read.consume();
		}
	});

	cache.value();
	unrelated.dirty().unwrap();
	cache.value();
	assert_eq!(calls.get(), 1);
	assert_eq!(cache.dependency_count(), 1);
}

#[test]
fn cache_without_dependencies_never_reruns() {
	let calls = Rc::new(Cell::new(0));
	let cache = Cache::new({
		let calls = calls.clone();
		move |()| calls.set(calls.get() + 1)
	});

	cache.value();
	create_tag().dirty().unwrap();
	cache.value();
	assert_eq!(calls.get(), 1);
	assert_eq!(cache.revision().get(), 0);
}

#[test]
fn dependencies_propagate_through_nested_caches() {
	let tag = create_tag();
	let outer_calls = Rc::new(Cell::new(0));

	let inner = Rc::new(Cache::new({
		let tag = tag.clone();
		move |()| {
			tag.consume();
			10
		}
	}));

	let outer = Cache::new({
		let inner = inner.clone();
		let outer_calls = outer_calls.clone();
		move |()| {
			outer_calls.set(outer_calls.get() + 1);
			inner.value() + 1
		}
	});

	// Inner is already valid, so the outer picks up its tags by propagation.
	assert_eq!(inner.value(), 10);
	assert_eq!(outer.value(), 11);
	assert_eq!(outer.dependency_count(), 1);

	assert_eq!(outer.value(), 11);
	assert_eq!(outer_calls.get(), 1);

	tag.dirty().unwrap();
	assert!(!outer.is_valid());
	assert_eq!(outer.value(), 11);
	assert_eq!(outer_calls.get(), 2);
}

#[test]
fn memoized_function_shares_cache_contract() {
	let value = Tracked::new(2);
	let calls = Rc::new(Cell::new(0));

	let doubled = memoize({
		let value = value.clone();
		let calls = calls.clone();
		move |()| {
			calls.set(calls.get() + 1);
			value.get() * 2
		}
	});

	assert_eq!(doubled(()), 4);
	assert_eq!(doubled(()), 4);
	value.set(5).unwrap();
	assert_eq!(doubled(()), 10);
	assert_eq!(calls.get(), 2);
}

#[test]
fn dirtying_consumed_tag_is_rejected() {
	let tag = create_tag();
	let before = current_revision();

	let cache = Cache::new({
		let tag = tag.clone();
		move |()| {
			tag.consume();
			tag.dirty()
		}
	});

	assert_eq!(
		cache.value(),
		Err(Error::ReentrantMutation {
			revision: tag.revision()
		})
	);
	assert_eq!(current_revision(), before);
}

#[test]
fn dirty_before_consume_is_allowed() {
	let tag = create_tag();
	let cache = Cache::new({
		let tag = tag.clone();
		move |()| {
			let dirtied = tag.dirty();
			tag.consume();
			dirtied
		}
	});

	assert_eq!(cache.value(), Ok(()));
}

#[test]
fn untracked_reads_do_not_invalidate() {
	let value = Tracked::new(1);
	let calls = Rc::new(Cell::new(0));

	let cache = Cache::new({
		let value = value.clone();
		let calls = calls.clone();
		move |()| {
			calls.set(calls.get() + 1);
			untracked(|| value.get())
		}
	});

	assert_eq!(cache.value(), 1);
	value.set(2).unwrap();
	assert_eq!(cache.value(), 1);
	assert_eq!(calls.get(), 1);
}

#[test]
fn tracked_set_fires_hook_once() {
	let dirties = count_dirties();
	let record = activate_tracking([("foo", tracked("FOO"))]);

	assert_eq!(record.get::<&str>("foo").unwrap(), "FOO");
	assert_eq!(dirties.get(), 0);

	record.set("foo", "BAR").unwrap();
	assert_eq!(record.get::<&str>("foo").unwrap(), "BAR");
	assert_eq!(dirties.get(), 1);
}

#[test]
fn tracked_equal_write_does_not_dirty() {
	let dirties = count_dirties();
	let value = Tracked::new(String::from("same"));
	let revision = value.revision();

	value.set(String::from("same")).unwrap();
	assert_eq!(value.revision(), revision);
	assert_eq!(dirties.get(), 0);

	value.update(|v| v.push('!')).unwrap();
	assert_eq!(value.get(), "same!");
	assert_eq!(dirties.get(), 1);

	assert_eq!(value.replace(String::from("new")).unwrap(), "same!");
	assert_eq!(value.replace(String::from("new")).unwrap(), "new");
	assert_eq!(dirties.get(), 2);
}

#[test]
fn tracked_initializer_runs_lazily() {
	let runs = Rc::new(Cell::new(0));
	let property = tracked_with({
		let runs = runs.clone();
		move || {
			runs.set(runs.get() + 1);
			vec![1, 2, 3]
		}
	});
	assert_eq!(runs.get(), 0);

	let value = property.activate();
	assert_eq!(runs.get(), 0);
	assert_eq!(value.with(|v| v.len()), 3);
	assert_eq!(value.get(), vec![1, 2, 3]);
	assert_eq!(runs.get(), 1);
}

#[test]
fn tracked_write_inside_reading_computation_fails() {
	let value = Tracked::new(1);
	let cache = Cache::new({
		let value = value.clone();
		move |()| {
			let current = value.get();
			value.set(current + 1)
		}
	});

	assert!(matches!(cache.value(), Err(Error::ReentrantMutation { .. })));
	assert_eq!(value.get_untracked(), 1);
}

#[test]
fn equal_write_inside_reading_computation_is_allowed() {
	let value = Tracked::new(1);
	let cache = Cache::new({
		let value = value.clone();
		move |()| {
			let current = value.get();
			value.set(current)?;
			let old = value.replace(current)?;
			let rejected = value.replace(current + 1);
			Ok::<_, Error>((old, rejected.is_err()))
		}
	});

	assert_eq!(cache.value(), Ok((1, true)));
	assert_eq!(value.get_untracked(), 1);
	assert!(cache.is_valid());
}

#[test]
fn hook_error_is_returned_from_dirty() {
	let tag = create_tag();
	set_on_tag_dirtied(|| Err(Error::RenderInProgress));

	let before = tag.revision();
	assert_eq!(dirty_tag(&tag), Err(Error::RenderInProgress));
	assert!(tag.revision() > before);

	clear_on_tag_dirtied();
	assert_eq!(dirty_tag(&tag), Ok(()));
}

#[test]
fn tracked_toggle() {
	let flag = Tracked::new(false);
	flag.toggle().unwrap();
	assert!(flag.get());
}

#[test]
fn record_activation_is_idempotent() {
	let record = TrackedRecord::builder()
		.property("foo", tracked(1u32))
		.property("bar", tracked(String::from("BAR")))
		.build();

	assert!(!record.activate("foo", tracked(2u32)));
	assert_eq!(record.get::<u32>("foo").unwrap(), 1);
	assert_eq!(record.len(), 2);

	assert_eq!(
		record.get::<u32>("missing"),
		Err(Error::UnknownProperty("missing".into()))
	);
	assert!(matches!(
		record.get::<u32>("bar"),
		Err(Error::PropertyType { .. })
	));
}

#[test]
fn record_cells_are_cached_per_name() {
	let record = TrackedRecord::new();
	let first = record.tracked_or_insert_with("baz", || 7i64).unwrap();
	let second = record.tracked_or_insert_with("baz", || 99i64).unwrap();

	assert_eq!(second.get(), 7);
	first.set(8).unwrap();
	assert_eq!(second.get(), 8);
	assert_eq!(first.tag(), second.tag());
}

tracked_struct! {
	struct Counter {
		count: u64 = 0,
		label: String = String::from("clicks"),
	}
}

#[test]
fn tracked_struct_accessors() {
	let counter = Counter::new();
	let mock = mock::SharedMock::new();

	let view = Cache::new({
		let count = counter.count().clone();
		let label = counter.label().clone();
		let mock = mock.clone();
		move |()| {
			let count = count.get();
			mock.get().rendered("view", count);
			format!("{} {}", count, label.get())
		}
	});

	mock.get()
		.expect_rendered()
		.with(predicate::eq("view"), predicate::eq(0))
		.times(1)
		.return_const(());
	assert_eq!(view.value(), "0 clicks");
	assert_eq!(view.value(), "0 clicks");
	mock.get().checkpoint();

	mock.get()
		.expect_rendered()
		.with(predicate::eq("view"), predicate::eq(3))
		.times(1)
		.return_const(());
	counter.count().set(3).unwrap();
	assert_eq!(view.value(), "3 clicks");
	mock.get().checkpoint();
}
