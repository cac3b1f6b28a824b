use super::*;

use crate::column::{FilterKind, ACTIONS_COLUMN_ID, ROW_NUMBER_COLUMN_ID, SELECTION_COLUMN_ID};
use crate::filter::FilterValue;
use crate::sort::SortDirection;
use crate::value::CellValue;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

const DEPARTMENTS: [&str; 4] = ["Engineering", "Design", "Sales", "Support"];
const STATUSES: [&str; 3] = ["active", "inactive", "pending"];

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn make_rows(n: u64, seed: u64) -> Vec<Row> {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = date(2022, 1, 1);
    (0..n)
        .map(|i| {
            Row::new(i)
                .with("name", format!("Person {}", i))
                .with("email", format!("person{}@example.com", i))
                .with("department", DEPARTMENTS[rng.gen_range(0..DEPARTMENTS.len())])
                .with("status", STATUSES[rng.gen_range(0..STATUSES.len())])
                .with("joinDate", start + chrono::Duration::days(rng.gen_range(0..730)))
                .with("salary", rng.gen_range(40..120) as i64 * 1000)
        })
        .collect()
}

fn defs() -> Vec<ColumnDef> {
    vec![
        ColumnDef::new("name").header("Name").size(150, 100, 400),
        ColumnDef::new("email").header("Email").size(200, 80, 500),
        ColumnDef::new("department")
            .filter(FilterKind::MultiSelect)
            .options(DEPARTMENTS),
        ColumnDef::new("status").filter(FilterKind::Select).options(STATUSES),
        ColumnDef::new("joinDate").filter(FilterKind::DateRange),
        ColumnDef::new("salary").filter(FilterKind::Number),
    ]
}

fn config() -> GridConfig {
    GridConfig {
        row_actions: true,
        ..GridConfig::default()
    }
}

fn coordinator(n: u64) -> ViewCoordinator {
    let dataset = Dataset::new(make_rows(n, 42)).unwrap();
    ViewCoordinator::new(dataset, defs(), config())
}

fn view_ids(grid: &ViewCoordinator) -> Vec<RowId> {
    grid.view().row_ids().into_iter().cloned().collect()
}

#[derive(Default)]
struct Recorded {
    selections: Vec<Vec<RowId>>,
    filters: Vec<FilterState>,
}

struct Recorder(Rc<RefCell<Recorded>>);

impl GridListener for Recorder {
    fn on_selection_change(&mut self, selected: &[&Row]) {
        self.0
            .borrow_mut()
            .selections
            .push(selected.iter().map(|r| r.id().clone()).collect());
    }

    fn on_filter_apply(&mut self, filters: &FilterState) {
        self.0.borrow_mut().filters.push(filters.clone());
    }
}

fn subscribe(grid: &mut ViewCoordinator) -> Rc<RefCell<Recorded>> {
    let recorded = Rc::new(RefCell::new(Recorded::default()));
    grid.subscribe(Box::new(Recorder(recorded.clone())));
    recorded
}

#[test]
fn multiselect_filter_keeps_exact_departments_and_renumbers() {
    let mut grid = coordinator(100);
    grid.apply_filters(
        FilterState::new().with("department", FilterValue::multi(["Engineering", "Design"])),
    );

    let view = grid.view();
    let expected = grid
        .dataset()
        .rows()
        .iter()
        .filter(|r| {
            let d = r.get("department");
            d == &CellValue::from("Engineering") || d == &CellValue::from("Design")
        })
        .count();

    assert!(expected > 0 && expected <= 100);
    assert_eq!(view.visible_count(), expected);
    assert!(view.rows.iter().all(|r| {
        let d = r.row.get("department");
        d == &CellValue::from("Engineering") || d == &CellValue::from("Design")
    }));
    let numbers: Vec<usize> = view.rows.iter().map(|r| r.number).collect();
    assert_eq!(numbers, (1..=expected).collect::<Vec<_>>());
}

#[test]
fn selection_survives_filter_round_trip() {
    let mut grid = coordinator(100);
    grid.toggle_select_all();
    assert_eq!(grid.selected_rows().len(), 100);

    grid.apply_filters(FilterState::new().with("name", FilterValue::text("Person 1")));
    // Person 1, Person 10..19, Person 100 doesn't exist: 11 rows
    assert_eq!(grid.view().visible_count(), 11);
    assert_eq!(grid.selected_rows().len(), 11);
    assert_eq!(grid.view().selected_count, 100);

    grid.clear_filters();
    assert_eq!(grid.selected_rows().len(), 100);
}

#[test]
fn excluded_selected_row_stays_selected() {
    let mut grid = coordinator(20);
    grid.toggle_row_selection(3u64);
    grid.apply_filters(FilterState::new().with("name", FilterValue::text("Person 4")));
    assert!(grid.selected_rows().is_empty());
    assert!(grid.state().selection.is_selected(&RowId::from(3u64)));
    grid.clear_filters();
    assert_eq!(grid.selected_rows().len(), 1);
}

#[test]
fn select_all_under_filter_is_scoped() {
    let mut grid = coordinator(100);
    grid.apply_filters(FilterState::new().with("status", FilterValue::select("active")));
    let filtered: HashSet<RowId> = view_ids(&grid).into_iter().collect();

    grid.toggle_select_all();
    let selected: HashSet<RowId> = grid.state().selection.ids().cloned().collect();
    assert_eq!(selected, filtered);

    grid.clear_filters();
    let after: HashSet<RowId> = grid.state().selection.ids().cloned().collect();
    assert_eq!(after, filtered);
    assert_eq!(grid.selected_rows().len(), filtered.len());
}

#[test]
fn toggle_select_all_off_leaves_outside_rows() {
    let mut grid = coordinator(30);
    grid.toggle_row_selection(0u64);
    grid.apply_filters(FilterState::new().with("name", FilterValue::text("Person 2")));
    grid.toggle_select_all();
    assert!(grid.view().all_visible_selected());
    grid.toggle_select_all();
    assert_eq!(grid.state().selection.len(), 1);
    assert!(grid.state().selection.is_selected(&RowId::from(0u64)));
}

#[test]
fn resize_below_min_is_clamped() {
    let mut grid = coordinator(5);
    assert_eq!(grid.resize_column("name", 30), Some(100));
    assert_eq!(grid.view().column("name").unwrap().size, 100);
    assert_eq!(
        grid.dispatch(GridAction::ResizeColumn { column: "name".into(), width: 30 }),
        Outcome::Clamped
    );
    assert_eq!(
        grid.dispatch(GridAction::ResizeColumn { column: "name".into(), width: 120 }),
        Outcome::Applied
    );
}

#[test]
fn repeated_drag_resize_is_consistent() {
    let mut grid = coordinator(5);
    for w in (0..600).step_by(7) {
        grid.resize_column("email", w);
    }
    assert_eq!(grid.resize_column("email", 250), Some(250));
    assert_eq!(grid.resize_column("email", 250), Some(250));
}

#[test]
fn sort_by_status_then_join_date_desc() {
    let mut grid = coordinator(100);
    grid.set_sort(vec![SortKey::ascending("status"), SortKey::descending("joinDate")]);
    let view = grid.view();

    for pair in view.rows.windows(2) {
        let (a, b) = (pair[0].row, pair[1].row);
        let sa = a.get("status").to_string();
        let sb = b.get("status").to_string();
        assert!(sa <= sb);
        if sa == sb {
            assert!(a.get("joinDate").as_date() >= b.get("joinDate").as_date());
        }
    }
    let numbers: Vec<usize> = view.rows.iter().map(|r| r.number).collect();
    assert_eq!(numbers, (1..=100).collect::<Vec<_>>());
}

#[test]
fn header_click_cycles_sort() {
    let mut grid = coordinator(10);
    grid.toggle_sort("salary");
    assert_eq!(grid.state().sort.direction_of("salary"), Some(SortDirection::Ascending));
    grid.toggle_sort("salary");
    assert_eq!(grid.state().sort.direction_of("salary"), Some(SortDirection::Descending));
    grid.toggle_sort("salary");
    assert!(grid.state().sort.is_empty());
    assert_eq!(grid.toggle_sort(ROW_NUMBER_COLUMN_ID), Outcome::Ignored);
    assert!(grid.state().sort.is_empty());
}

#[test]
fn date_range_open_upper_bound() {
    let mut grid = coordinator(100);
    let from = date(2023, 2, 1);
    grid.apply_filters(
        FilterState::new().with("joinDate", FilterValue::DateRange { from: Some(from), to: None }),
    );
    let view = grid.view();
    let expected = grid
        .dataset()
        .rows()
        .iter()
        .filter(|r| r.get("joinDate").as_date().is_some_and(|d| d >= from))
        .count();
    assert_eq!(view.visible_count(), expected);
    assert!(view.rows.iter().all(|r| r.row.get("joinDate").as_date().unwrap() >= from));
}

#[test]
fn unpin_all_keeps_layout_and_synthetic_columns() {
    let mut grid = coordinator(5);
    grid.resize_column("email", 333);
    assert_eq!(grid.pin_column("email", Pin::Left), Outcome::Applied);
    {
        let view = grid.view();
        let order: Vec<&str> = view.columns.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(&order[..3], &[SELECTION_COLUMN_ID, ROW_NUMBER_COLUMN_ID, "email"]);
    }

    grid.unpin_all();
    let view = grid.view();
    let email = view.column("email").unwrap();
    assert_eq!(email.pin, Pin::None);
    assert_eq!(email.size, 333);
    assert_eq!(view.columns[0].id, SELECTION_COLUMN_ID);
    assert_eq!(view.columns[0].pin, Pin::Left);
    assert_eq!(view.columns[1].id, ROW_NUMBER_COLUMN_ID);
    assert_eq!(view.columns[1].offset, 40);
}

#[test]
fn synthetic_columns_hold_position_under_random_layout_edits() {
    let mut grid = coordinator(5);
    let mut rng = StdRng::seed_from_u64(99);
    let targets = ["name", "email", "department", "status", "joinDate", "salary",
        SELECTION_COLUMN_ID, ROW_NUMBER_COLUMN_ID, ACTIONS_COLUMN_ID];
    let pins = [Pin::None, Pin::Left, Pin::Right];

    for _ in 0..300 {
        let column = targets[rng.gen_range(0..targets.len())];
        match rng.gen_range(0..4) {
            0 => {
                grid.pin_column(column, pins[rng.gen_range(0..pins.len())]);
            }
            1 => {
                grid.toggle_column_visibility(column);
            }
            2 => {
                grid.unpin_all();
            }
            _ => {
                grid.reset_pinning();
            }
        }

        let view = grid.view();
        let order: Vec<&str> = view.columns.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(order[0], SELECTION_COLUMN_ID);
        assert_eq!(order[1], ROW_NUMBER_COLUMN_ID);
        assert_eq!(*order.last().unwrap(), ACTIONS_COLUMN_ID);
    }
}

#[test]
fn row_numbers_match_filtered_set_under_random_filters() {
    let mut grid = coordinator(150);
    let mut rng = StdRng::seed_from_u64(5);

    for _ in 0..40 {
        let mut filters = FilterState::new();
        if rng.gen_bool(0.5) {
            filters = filters.with("status", FilterValue::select(STATUSES[rng.gen_range(0..3)]));
        }
        if rng.gen_bool(0.5) {
            filters = filters.with("name", FilterValue::text(format!("{}", rng.gen_range(0..10))));
        }
        if rng.gen_bool(0.3) {
            filters = filters.with_search("engineering");
        }
        grid.apply_filters(filters.clone());
        if rng.gen_bool(0.5) {
            grid.toggle_sort("salary");
        }

        let view = grid.view();
        let numbers: Vec<usize> = view.rows.iter().map(|r| r.number).collect();
        assert_eq!(numbers, (1..=view.visible_count()).collect::<Vec<_>>());

        let numbered: HashSet<&RowId> = view.rows.iter().map(|r| r.row.id()).collect();
        let expected: HashSet<&RowId> = grid
            .dataset()
            .rows()
            .iter()
            .filter(|r| crate::filter::matches(&grid.state().columns, r, &filters))
            .map(|r| r.id())
            .collect();
        assert_eq!(numbered, expected);
    }
}

#[test]
fn row_number_changes_with_filter_not_data() {
    let mut grid = coordinator(20);
    let id = RowId::from(15u64);
    assert_eq!(grid.view().number_of(&id), Some(16));
    grid.apply_filters(FilterState::new().with("name", FilterValue::text("Person 1")));
    // Person 1, Person 10..15 precede it: 1, 10, 11, 12, 13, 14, 15
    assert_eq!(grid.view().number_of(&id), Some(7));
}

#[test]
fn set_sort_applies_surviving_keys() {
    let mut grid = coordinator(10);
    let outcome = grid.set_sort(vec![
        SortKey::descending("salary"),
        SortKey::ascending(ROW_NUMBER_COLUMN_ID),
        SortKey::ascending("missing"),
    ]);
    assert_eq!(outcome, Outcome::Applied);
    assert_eq!(grid.state().sort.keys(), &[SortKey::descending("salary")]);
}

#[test]
fn apply_filters_keeps_search_term_when_none_given() {
    let mut grid = coordinator(30);
    grid.set_global_search("person 2");
    grid.apply_filters(FilterState::new().with("status", FilterValue::select("active")));
    assert_eq!(grid.state().filters.global_search, "person 2");
    assert!(grid
        .view()
        .rows
        .iter()
        .all(|r| r.row.get("name").to_string().starts_with("Person 2")));

    grid.apply_filters(FilterState::new().with_search("person 1"));
    assert_eq!(grid.state().filters.global_search, "person 1");
    grid.set_global_search("");
    assert_eq!(grid.state().filters.search_term(), None);
}

#[test]
fn clear_filters_keeps_sort_selection_and_layout() {
    let mut grid = coordinator(50);
    grid.toggle_sort("name");
    grid.toggle_row_selection(7u64);
    grid.resize_column("name", 222);
    grid.pin_column("status", Pin::Right);
    grid.apply_filters(FilterState::new().with("name", FilterValue::text("9")).with_search("person"));

    grid.clear_filters();
    let state = grid.state();
    assert!(state.filters.is_empty());
    assert_eq!(state.filters.global_search, "");
    assert_eq!(state.sort.direction_of("name"), Some(SortDirection::Ascending));
    assert!(state.selection.is_selected(&RowId::from(7u64)));
    assert_eq!(state.columns.size("name"), Some(222));
    assert_eq!(state.columns.pin_of("status"), Some(Pin::Right));
}

#[test]
fn listeners_receive_selection_and_filter_events() {
    let mut grid = coordinator(10);
    let recorded = subscribe(&mut grid);

    grid.toggle_row_selection(2u64);
    grid.apply_filters(
        FilterState::new()
            .with("name", FilterValue::text("Person"))
            .with("email", FilterValue::text("")),
    );
    grid.clear_selection();
    grid.clear_selection();
    grid.resize_column("name", 300);

    let recorded = recorded.borrow();
    assert_eq!(recorded.selections, vec![vec![RowId::from(2u64)], vec![]]);
    assert_eq!(recorded.filters.len(), 1);
    assert_eq!(recorded.filters[0].columns.len(), 1);
    assert!(recorded.filters[0].get("name").is_some());
}

#[test]
fn set_dataset_drops_ghost_selections() {
    let mut grid = coordinator(10);
    let recorded = subscribe(&mut grid);
    grid.toggle_row_selection(1u64);
    grid.toggle_row_selection(8u64);

    let kept: Vec<Row> = make_rows(10, 42).into_iter().filter(|r| r.id().as_str() != "8").collect();
    grid.set_dataset(Dataset::new(kept).unwrap());

    assert_eq!(grid.state().selection.len(), 1);
    assert!(grid.state().selection.is_selected(&RowId::from(1u64)));
    assert_eq!(recorded.borrow().selections.last().unwrap(), &vec![RowId::from(1u64)]);
}

#[test]
fn unknown_row_selection_is_ignored() {
    let mut grid = coordinator(3);
    assert_eq!(grid.toggle_row_selection("nope"), Outcome::Ignored);
    assert!(grid.state().selection.is_empty());
}

#[test]
fn selection_disabled_removes_column_and_ignores_toggles() {
    let dataset = Dataset::new(make_rows(5, 1)).unwrap();
    let cfg = GridConfig {
        enable_selection: false,
        ..GridConfig::default()
    };
    let mut grid = ViewCoordinator::new(dataset, defs(), cfg);
    assert_eq!(grid.toggle_row_selection(1u64), Outcome::Ignored);
    assert_eq!(grid.toggle_select_all(), Outcome::Ignored);
    assert_eq!(grid.view().columns[0].id, ROW_NUMBER_COLUMN_ID);
}

#[test]
fn auto_fit_uses_filtered_rows() {
    let rows = vec![
        Row::new("a").with("name", "Al"),
        Row::new("b").with("name", "An extremely long name that is hidden"),
    ];
    let mut grid = ViewCoordinator::new(Dataset::new(rows).unwrap(), defs(), config());
    let per_char = |s: &str| s.chars().count() as u32 * 10;

    grid.apply_filters(FilterState::new().with("name", FilterValue::text("Al")));
    // header "Name" = 40, "Al" = 20, clamped to min 100
    assert_eq!(grid.auto_fit_column_with("name", &per_char), Some(100));

    grid.clear_filters();
    let long = "An extremely long name that is hidden".chars().count() as u32 * 10;
    assert_eq!(grid.auto_fit_column_with("name", &per_char), Some(long.min(400)));
}

#[test]
fn auto_fit_action_uses_display_width() {
    let mut grid = coordinator(3);
    let applied = grid.auto_fit_column("email").unwrap();
    // "person0@example.com" is 19 cells: 19 * 8 + 24
    assert_eq!(applied, 176);
}

#[test]
fn filters_on_non_filterable_columns_are_dropped() {
    let defs = vec![ColumnDef::new("name"), ColumnDef::new("email").filterable(false)];
    let mut grid = ViewCoordinator::new(Dataset::new(make_rows(10, 3)).unwrap(), defs, config());
    grid.apply_filters(FilterState::new().with("email", FilterValue::text("person3@")));
    assert_eq!(grid.view().visible_count(), 10);
    assert!(grid.state().filters.columns.is_empty());
}

#[test]
fn reduce_is_pure_and_replayable() {
    let dataset = Dataset::new(make_rows(40, 11)).unwrap();
    let cfg = config();
    let actions = vec![
        GridAction::ToggleSort { column: "salary".into() },
        GridAction::ApplyFilters {
            filters: FilterState::new().with("status", FilterValue::select("active")),
        },
        GridAction::ToggleSelectAll,
        GridAction::PinColumn { column: "email".into(), pin: Pin::Right },
        GridAction::ResizeColumn { column: "name".into(), width: 10 },
        GridAction::ClearFilters,
    ];

    let initial = GridState::new(defs(), &cfg);
    let replay = |state: &GridState| {
        actions
            .iter()
            .fold(state.clone(), |s, a| s.reduce(a, &dataset, &cfg).0)
    };
    let first = replay(&initial);
    let second = replay(&initial);
    assert_eq!(first, second);
    assert_eq!(initial, GridState::new(defs(), &cfg));

    let a = derive_view(&dataset, &first, &cfg);
    let b = derive_view(&dataset, &second, &cfg);
    assert_eq!(a.rows, b.rows);
    assert_eq!(a.columns, b.columns);
}

#[test]
fn grid_action_log_round_trips_through_toml() {
    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Log {
        actions: Vec<GridAction>,
    }

    let log = Log {
        actions: vec![
            GridAction::PinColumn { column: "email".into(), pin: Pin::Left },
            GridAction::SetGlobalSearch { term: "ada".into() },
            GridAction::UnpinAll,
        ],
    };
    let text = toml::to_string(&log).unwrap();
    let back: Log = toml::from_str(&text).unwrap();
    assert_eq!(back, log);
}

#[test]
fn with_state_prunes_selection_for_new_dataset() {
    let mut grid = coordinator(10);
    grid.toggle_row_selection(9u64);
    let saved = grid.state().clone();

    let smaller = Dataset::new(make_rows(5, 42)).unwrap();
    let restored = ViewCoordinator::with_state(smaller, saved, config());
    assert!(restored.state().selection.is_empty());
}
