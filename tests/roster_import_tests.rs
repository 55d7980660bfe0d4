use pki_scheduler::{
    ClassStore, SqliteClassStore, export_classes_to_string, import_roster, import_roster_file,
    save_classes_to_csv,
};
use std::io::Write;
use tempfile::NamedTempFile;

const ROSTER: &str = "\
Fall 2025,,,,,,,,,,,,
\"Generated 8/1/2025, 10:00:00 AM\",,,,,,,,,,,,
,Term,Course,Section #,Course Title,Instructor,Room,Meeting Pattern,Enrollment,Maximum Enrollment,Cross-listings,Cross-list Maximum,
CSCI 1010 - Intro to CS
,Fall 2025,CSCI 1010,001,Intro to CS,\"Smith, John (1001) [Primary, 100%]\",PKI 160,TTh 9:00am-10:15am,28,30,,,
,Fall 2025,CSCI 1010,002,Intro to CS,\"Smith, John (1001) [Primary, 100%]\",PKI 161,MW 9:00am-10:15am,18,40,,,
,Fall 2025,CSCI 2030,001,Data Structures,\"Doe, Jane (1002) [Primary, 50%]; Smith, John (1001) [Secondary, 50%]\",PKI 170,TTh 9:00am-10:15am,45,40,,,
,Fall 2025,CSCI 4000,001,Topics,\"Lee, Ann (1003) [Primary, 100%]\",PKI 260,MW 1:00pm-2:15pm,10,20,CIST 4000 / CSCI 4000,35,
,Fall 2025,CIST 4000,001,Topics,\"Lee, Ann (1003) [Primary, 100%]\",PKI 260,MW 1:00pm-2:15pm,12,20,CIST 4000 / CSCI 4000,35,
,Fall 2025,CSCI 8970,001,Independent Study,Staff,,,0,0,,,
";

fn roster_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn import_creates_one_class_per_section() {
    let store = SqliteClassStore::open_in_memory().unwrap();
    let report = import_roster(&store, ROSTER.as_bytes()).unwrap();

    assert_eq!(report.inserted, 5);
    assert_eq!(report.updated, 0);
    assert!(report.skipped.is_empty(), "{:?}", report.skipped);

    let classes = store.all_classes().unwrap();
    assert_eq!(classes.len(), 5);
    let courses: Vec<&str> = classes.iter().map(|c| c.course_number.as_str()).collect();
    assert_eq!(
        courses,
        vec![
            "CSCI 1010",
            "CSCI 1010",
            "CSCI 2030",
            "CIST 4000 / CSCI 4000",
            "CSCI 8970"
        ]
    );

    let merged = &classes[3];
    assert_eq!(merged.enrollment, 22);
    assert_eq!(merged.max_enrollment, 35);
    assert_eq!(merged.room, "PKI 260");
    assert!(classes[4].is_remote());
}

#[test]
fn instructors_are_created_once_and_linked() {
    let store = SqliteClassStore::open_in_memory().unwrap();
    let report = import_roster(&store, ROSTER.as_bytes()).unwrap();
    assert_eq!(report.professors_created, 3);

    let professors = store.list_professors().unwrap();
    let names: Vec<String> = professors.iter().map(|p| p.name().to_string()).collect();
    assert_eq!(
        names,
        vec![
            "Doe, Jane (1002)",
            "Lee, Ann (1003)",
            "Smith, John (1001)"
        ]
    );

    let classes = store.all_classes().unwrap();
    let data_structures = store.professors_for_class(classes[2].id).unwrap();
    assert_eq!(data_structures.len(), 2);
    assert_eq!(data_structures[0].last_name, "Doe");
    assert_eq!(data_structures[1].p_id.as_deref(), Some("1001"));

    let independent_study = store.professors_for_class(classes[4].id).unwrap();
    assert!(independent_study.is_empty());
}

#[test]
fn reimport_updates_in_place() {
    let store = SqliteClassStore::open_in_memory().unwrap();
    import_roster(&store, ROSTER.as_bytes()).unwrap();
    let before = store.all_classes().unwrap();

    let changed = ROSTER.replace(
        "PKI 170,TTh 9:00am-10:15am,45,40",
        "PKI 270,TTh 9:00am-10:15am,41,50",
    );
    let report = import_roster(&store, changed.as_bytes()).unwrap();
    assert_eq!(report.inserted, 0);
    assert_eq!(report.updated, 5);
    assert_eq!(report.professors_created, 0);

    let after = store.all_classes().unwrap();
    assert_eq!(after.len(), before.len());
    for (old, new) in before.iter().zip(&after) {
        assert_eq!(old.id, new.id);
    }
    assert_eq!(after[2].room, "PKI 270");
    assert_eq!(after[2].enrollment, 41);
    assert_eq!(after[2].max_enrollment, 50);
    assert_eq!(store.list_professors().unwrap().len(), 3);
}

#[test]
fn bad_rows_are_reported_and_the_rest_imported() {
    let doc = "\
Term,Course,Section #,Course Title,Instructor,Room,Meeting Pattern,Enrollment,Maximum Enrollment
Fall 2025,CSCI 1010,001,Intro,\"Smith, John (1)\",PKI 160,MW 9:00am,10,30
Fall 2025,CSCI 1020,001,Next,\"Smith, John (1)\",PKI 161,MW 9:00am,ten,30
Fall 2025,CSCI 1030,001,Later,\"Smith, John (1)\",PKI 162,MW 9:00am,-2,30
Fall 2025,CSCI 1010,001,Intro again,\"Smith, John (1)\",PKI 160,MW 9:00am,11,30
Fall 2025,CSCI 1040,001,Last,\"Doe, Jane (2)\",PKI 163,TTh 9:00am,5,30
";
    let store = SqliteClassStore::open_in_memory().unwrap();
    let report = import_roster(&store, doc.as_bytes()).unwrap();

    assert_eq!(report.inserted, 2);
    let rows: Vec<u64> = report.skipped.iter().map(|err| err.row).collect();
    assert_eq!(rows, vec![3, 4, 5]);
    assert!(report.skipped[0].reason.contains("ten"));
    assert!(report.skipped[1].reason.contains("must not be negative"));
    assert!(report.skipped[2].reason.contains("duplicate class CSCI 1010"));

    let classes = store.all_classes().unwrap();
    assert_eq!(classes[0].course_title, "Intro");
    assert_eq!(classes[0].enrollment, 10);
}

#[test]
fn missing_columns_abort_without_writing() {
    let store = SqliteClassStore::open_in_memory().unwrap();
    let err = import_roster(&store, "Course,Room\nCSCI 1010,PKI 160\n".as_bytes()).unwrap_err();
    assert!(err.is_client_error());
    assert!(err.to_string().contains("Course Title"));
    assert!(store.all_classes().unwrap().is_empty());
}

#[test]
fn data_survives_reopening_the_database() {
    let db = NamedTempFile::new().unwrap();
    let roster = roster_file(ROSTER);
    {
        let store = SqliteClassStore::new(db.path()).unwrap();
        import_roster_file(&store, roster.path()).unwrap();
    }
    let store = SqliteClassStore::new(db.path()).unwrap();
    assert_eq!(store.all_classes().unwrap().len(), 5);
    assert_eq!(store.list_professors().unwrap().len(), 3);
}

#[test]
fn export_starts_with_term_and_generated_lines() {
    let store = SqliteClassStore::open_in_memory().unwrap();
    import_roster(&store, ROSTER.as_bytes()).unwrap();

    let exported = export_classes_to_string(&store).unwrap();
    let mut lines = exported.lines();
    assert_eq!(lines.next(), Some("Fall 2025"));
    assert!(lines.next().unwrap().starts_with("\"Generated "));
    assert_eq!(
        lines.next(),
        Some(
            "Term,Course,Section #,Course Title,Instructor,Room,Meeting Pattern,Enrollment,Maximum Enrollment,Cross-listings,Cross-list Maximum"
        )
    );
    assert_eq!(lines.count(), 5);
    assert!(exported.contains("\"Doe, Jane (1002); Smith, John (1001)\""));
}

#[test]
fn exported_roster_imports_back_to_the_same_classes() {
    let source = SqliteClassStore::open_in_memory().unwrap();
    import_roster(&source, ROSTER.as_bytes()).unwrap();
    let out = NamedTempFile::new().unwrap();
    assert_eq!(save_classes_to_csv(&source, out.path()).unwrap(), 5);

    let copy = SqliteClassStore::open_in_memory().unwrap();
    let report = import_roster_file(&copy, out.path()).unwrap();
    assert_eq!(report.inserted, 5);
    assert!(report.skipped.is_empty(), "{:?}", report.skipped);

    let strip = |store: &SqliteClassStore| {
        store
            .all_classes()
            .unwrap()
            .into_iter()
            .map(|c| {
                (
                    c.term,
                    c.course_number,
                    c.section,
                    c.course_title,
                    c.room,
                    c.meeting_pattern,
                    c.enrollment,
                    c.max_enrollment,
                )
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(strip(&source), strip(&copy));
    assert_eq!(
        source.list_professors().unwrap().len(),
        copy.list_professors().unwrap().len()
    );
}

#[test]
fn first_last_instructor_with_role_creates_professor() {
    let doc = "\
Term,Course,Section #,Course Title,Instructor,Room,Meeting Pattern,Enrollment,Maximum Enrollment
Fall 2025,CSCI 1010,001,Intro,\"Jane Doe (2) [Primary, 100%]\",PKI 160,MW 9:00am,10,30
";
    let store = SqliteClassStore::open_in_memory().unwrap();
    let report = import_roster(&store, doc.as_bytes()).unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(report.professors_created, 1);

    let professors = store.professors_for_class(1).unwrap();
    assert_eq!(professors.len(), 1);
    assert_eq!(professors[0].first_name, "Jane");
    assert_eq!(professors[0].last_name, "Doe");
    assert_eq!(professors[0].p_id.as_deref(), Some("2"));
}

#[test]
fn empty_term_survives_export_and_reimport() {
    let doc = "\
Term,Course,Section #,Course Title,Instructor,Room,Meeting Pattern,Enrollment,Maximum Enrollment
Fall 2025,CSCI 1010,001,Intro,\"Smith, John (1)\",PKI 160,MW 9:00am,10,30
Fall 2025,CSCI 1020,001,Data,\"Smith, John (1)\",PKI 161,MW 9:00am,10,30
,CSCI 1010,001,Intro,\"Smith, John (1)\",PKI 162,TTh 9:00am,5,30
";
    let source = SqliteClassStore::open_in_memory().unwrap();
    assert_eq!(import_roster(&source, doc.as_bytes()).unwrap().inserted, 3);
    let exported = export_classes_to_string(&source).unwrap();

    let copy = SqliteClassStore::open_in_memory().unwrap();
    let report = import_roster(&copy, exported.as_bytes()).unwrap();
    assert_eq!(report.inserted, 3);
    assert!(report.skipped.is_empty(), "{:?}", report.skipped);

    let terms: Vec<String> = copy.all_classes().unwrap().into_iter().map(|c| c.term).collect();
    assert_eq!(terms, vec!["Fall 2025", "Fall 2025", ""]);
}
