use staffdir_core::db::{open_db_in_memory, SharedConnection};
use staffdir_core::{
    EmployeeCache, EmployeeDirectory, EmployeeFilter, EmployeeInput, ListRequest, Principal, Role,
    SqliteEmployeeRepository, SqliteUserRepository, UserService,
};
use std::sync::Arc;

fn directory() -> EmployeeDirectory<SqliteEmployeeRepository> {
    let conn = SharedConnection::new(open_db_in_memory().unwrap());
    EmployeeDirectory::new(SqliteEmployeeRepository::try_new(conn).unwrap())
}

fn admin() -> Principal {
    Principal::admin("admin")
}

fn seed(directory: &EmployeeDirectory<SqliteEmployeeRepository>) {
    let rows = [
        ("Ann", 25, "10A", vec!["Math"]),
        ("Ben", 31, "10A", vec!["Art", "History"]),
        ("Cleo", 42, "10B", vec!["Math", "Physics"]),
        ("Dana", 19, "11C", vec!["History"]),
        ("Ethan", 57, "10B", vec!["Math"]),
    ];
    for (name, age, class_name, subjects) in rows {
        let input = EmployeeInput::new(
            name,
            age,
            class_name,
            subjects.into_iter().map(str::to_string).collect(),
        );
        directory.create(&input, &admin()).unwrap();
    }
}

fn names(page: &staffdir_core::Page<staffdir_core::Employee>) -> Vec<&str> {
    page.content.iter().map(|employee| employee.name.as_str()).collect()
}

#[test]
fn ann_is_found_by_class_name() {
    let directory = directory();
    let ann = directory
        .create(
            &EmployeeInput::new("Ann", 25, "10A", vec!["Math".to_string()]),
            &admin(),
        )
        .unwrap();

    let page = directory
        .list(
            &ListRequest::new(EmployeeFilter::default().with_class_name("10A")).with_page(0, 10),
            &admin(),
        )
        .unwrap();

    assert_eq!(page.content.len(), 1);
    assert_eq!(page.content[0].id, ann.id);
    assert_eq!(page.page_info.page_number, 0);
    assert_eq!(page.page_info.total_elements, 1);
    assert!(!page.page_info.has_next);
    assert!(!page.page_info.has_previous);
}

#[test]
fn empty_filter_counts_everything() {
    let directory = directory();
    seed(&directory);

    let unfiltered = directory.list(&ListRequest::default(), &admin()).unwrap();
    let empty_filter = directory
        .list(&ListRequest::new(EmployeeFilter::default()), &admin())
        .unwrap();
    let blank_name = directory
        .list(
            &ListRequest::new(EmployeeFilter::default().with_name("  ")),
            &admin(),
        )
        .unwrap();

    assert_eq!(unfiltered.page_info.total_elements, 5);
    assert_eq!(empty_filter.page_info.total_elements, 5);
    assert_eq!(blank_name.page_info.total_elements, 5);
}

#[test]
fn filters_combine_with_and() {
    let directory = directory();
    seed(&directory);

    let filter = EmployeeFilter::default()
        .with_class_name("10B")
        .with_subject("Math")
        .with_age_range(Some(40), Some(50));
    let page = directory.list(&ListRequest::new(filter), &admin()).unwrap();
    assert_eq!(names(&page), vec!["Cleo"]);

    let filter = EmployeeFilter::default().with_name("e");
    let page = directory
        .list(&ListRequest::new(filter).with_sort("name", "asc"), &admin())
        .unwrap();
    assert_eq!(names(&page), vec!["Ben", "Cleo", "Ethan"]);
}

#[test]
fn loosely_typed_filters_parse_or_name_the_field() {
    let directory = directory();
    seed(&directory);

    let filter = EmployeeFilter::from_pairs([("minAge", "40"), ("className", "10B")]).unwrap();
    let page = directory
        .list(&ListRequest::new(filter).with_sort("age", "desc"), &admin())
        .unwrap();
    assert_eq!(names(&page), vec!["Ethan", "Cleo"]);

    let err = EmployeeFilter::from_pairs([("minAge", "forty")]).unwrap_err();
    let err: staffdir_core::DirectoryError = err.into();
    assert_eq!(err.field(), Some("minAge"));
}

#[test]
fn pagination_metadata_is_consistent() {
    let directory = directory();
    seed(&directory);

    let first = directory
        .list(
            &ListRequest::default().with_page(0, 2).with_sort("age", "ASC"),
            &admin(),
        )
        .unwrap();
    assert_eq!(names(&first), vec!["Dana", "Ann"]);
    assert_eq!(first.page_info.total_pages, 3);
    assert!(first.page_info.has_next);
    assert!(!first.page_info.has_previous);

    let last = directory
        .list(
            &ListRequest::default().with_page(2, 2).with_sort("age", "ASC"),
            &admin(),
        )
        .unwrap();
    assert_eq!(names(&last), vec!["Ethan"]);
    assert!(!last.page_info.has_next);
    assert!(last.page_info.has_previous);

    let beyond = directory
        .list(&ListRequest::default().with_page(7, 2), &admin())
        .unwrap();
    assert!(beyond.content.is_empty());
    assert_eq!(beyond.page_info.total_elements, 5);
    assert!(!beyond.page_info.has_next);
}

#[test]
fn unrecognized_direction_sorts_ascending() {
    let directory = directory();
    seed(&directory);

    let page = directory
        .list(
            &ListRequest::default().with_sort("className", "sideways"),
            &admin(),
        )
        .unwrap();
    let classes: Vec<_> = page
        .content
        .iter()
        .map(|employee| employee.class_name.as_str())
        .collect();
    assert_eq!(classes, vec!["10A", "10A", "10B", "10B", "11C"]);
}

#[test]
fn lists_never_populate_the_cache() {
    let directory = directory();
    seed(&directory);
    directory.list(&ListRequest::default(), &admin()).unwrap();
    assert!(directory.cache().is_empty());
}

#[test]
fn employee_list_is_restricted_to_own_record() {
    let conn = SharedConnection::new(open_db_in_memory().unwrap());
    let cache = Arc::new(EmployeeCache::new());
    let directory = EmployeeDirectory::with_cache(
        SqliteEmployeeRepository::try_new(conn.clone()).unwrap(),
        Arc::clone(&cache),
    );
    let users = UserService::new(SqliteUserRepository::try_new(conn).unwrap(), cache);
    seed(&directory);

    let ben = directory
        .list(
            &ListRequest::new(EmployeeFilter::default().with_name("Ben")),
            &admin(),
        )
        .unwrap()
        .content
        .remove(0);
    users
        .register("ben", "hash", Role::Employee, Some(ben.id))
        .unwrap();

    let page = directory
        .list(&ListRequest::default(), &Principal::employee("ben"))
        .unwrap();
    assert_eq!(names(&page), vec!["Ben"]);
    assert_eq!(page.page_info.total_elements, 1);
    assert_eq!(page.page_info.total_pages, 1);

    let filtered_out = directory
        .list(
            &ListRequest::new(EmployeeFilter::default().with_class_name("10B")),
            &Principal::employee("ben"),
        )
        .unwrap();
    assert_eq!(filtered_out.page_info.total_elements, 0);

    let stranger = directory
        .list(&ListRequest::default(), &Principal::employee("nobody"))
        .unwrap();
    assert!(stranger.content.is_empty());
}

#[test]
fn page_info_serializes_in_camel_case() {
    let directory = directory();
    seed(&directory);
    let page = directory
        .list(&ListRequest::default().with_page(0, 2), &admin())
        .unwrap();
    let json = serde_json::to_value(page.page_info).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "pageNumber": 0,
            "pageSize": 2,
            "totalElements": 5,
            "totalPages": 3,
            "hasNext": true,
            "hasPrevious": false
        })
    );
}

#[test]
fn name_filter_folds_non_ascii_case() {
    let directory = directory();
    seed(&directory);
    let elodie = directory
        .create(
            &EmployeeInput::new("Élodie", 33, "11C", vec!["French".to_string()]),
            &admin(),
        )
        .unwrap();

    for needle in ["Élodie", "élodie", "ÉLODIE", "lodie", "ÉL"] {
        let page = directory
            .list(
                &ListRequest::new(EmployeeFilter::default().with_name(needle)),
                &admin(),
            )
            .unwrap();
        assert_eq!(page.page_info.total_elements, 1, "needle={needle}");
        assert_eq!(page.content[0].id, elodie.id);
    }
}

#[test]
fn renamed_employee_is_found_by_new_name_only() {
    let directory = directory();
    let created = directory
        .create(
            &EmployeeInput::new("Zoë", 40, "10A", vec!["Math".to_string()]),
            &admin(),
        )
        .unwrap();
    directory
        .update(
            created.id,
            &EmployeeInput::new("Ömer", 40, "10A", vec!["Math".to_string()]),
            &admin(),
        )
        .unwrap();

    let by_old = directory
        .list(&ListRequest::new(EmployeeFilter::default().with_name("ZOË")), &admin())
        .unwrap();
    let by_new = directory
        .list(&ListRequest::new(EmployeeFilter::default().with_name("ömer")), &admin())
        .unwrap();
    assert_eq!(by_old.page_info.total_elements, 0);
    assert_eq!(names(&by_new), vec!["Ömer"]);
}

#[test]
fn negative_age_bounds_are_accepted() {
    let directory = directory();
    seed(&directory);

    let lower = EmployeeFilter::from_pairs([("minAge", "-5")]).unwrap();
    let page = directory.list(&ListRequest::new(lower), &admin()).unwrap();
    assert_eq!(page.page_info.total_elements, 5);

    let upper = EmployeeFilter::from_pairs([("maxAge", "-5")]).unwrap();
    let page = directory.list(&ListRequest::new(upper), &admin()).unwrap();
    assert_eq!(page.page_info.total_elements, 0);
}
