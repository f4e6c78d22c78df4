//! End-to-end behaviour of collections over the on-disk backends

use std::sync::Arc;

use chrono::NaiveDate;
use finca_core::{
    cascade_farm_rename, create_backend, dangling_references, relations::PLOT_FARM, BackendType,
    CollectionEditor, CollectionStore, Crop, CropForm, Farm, FileBackend, FincaError, KeyValueStore,
    LoadStatus, Plot, Role, RoleForm, SqliteBackend, Variety,
};
use tempfile::TempDir;

fn farms() -> Vec<Farm> {
    vec![
        Farm::new("Finca A", "Ana", "Arrozal del norte", "12", "hectáreas"),
        Farm::new("Finca B", "Luis", "Vega", "300", "m2"),
    ]
}

async fn assert_round_trip(backend: Arc<dyn KeyValueStore>) {
    let store = CollectionStore::new(backend);

    store.save(&farms()).await.unwrap();
    let loaded: Vec<Farm> = store.load().await.unwrap();
    assert_eq!(loaded, farms());

    // Collections are independent keys
    let varieties: Vec<Variety> = store.load().await.unwrap();
    assert!(varieties.is_empty());
}

#[tokio::test]
async fn test_file_backend_round_trip_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    assert_round_trip(Arc::new(FileBackend::new(temp_dir.path()))).await;

    let reopened = CollectionStore::new(Arc::new(FileBackend::new(temp_dir.path())));
    let loaded: Vec<Farm> = reopened.load().await.unwrap();
    assert_eq!(loaded.len(), 2);
    assert!(temp_dir.path().join("fincas.json").exists());
}

#[tokio::test]
async fn test_sqlite_backend_round_trip_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("finca.db");
    assert_round_trip(Arc::new(SqliteBackend::new(&db).unwrap())).await;

    let reopened = CollectionStore::new(create_backend(&db, None).unwrap());
    assert_eq!(reopened.backend().backend_type(), BackendType::Sqlite);
    let loaded: Vec<Farm> = reopened.load().await.unwrap();
    assert_eq!(loaded, farms());
}

#[tokio::test]
async fn test_renaming_a_farm_orphans_its_plots() {
    let temp_dir = TempDir::new().unwrap();
    let store = CollectionStore::new(Arc::new(FileBackend::new(temp_dir.path())));

    let (mut farm_editor, _) = CollectionEditor::<Farm>::open(store.clone()).await;
    let (mut plot_editor, _) = CollectionEditor::<Plot>::open(store.clone()).await;
    farm_editor.submit(farms().remove(0)).await.unwrap();
    plot_editor
        .submit(Plot::new("Lote 1", "2", "m2", "Norte", "Finca A"))
        .await
        .unwrap();

    let mut renamed = farm_editor.begin_edit(0).unwrap().clone();
    renamed.name = "Finca Z".into();
    farm_editor.submit(renamed).await.unwrap();

    let plots: Vec<Plot> = store.load().await.unwrap();
    let farms: Vec<Farm> = store.load().await.unwrap();
    assert_eq!(plots[0].farm, "Finca A");
    assert_eq!(dangling_references(&plots, &PLOT_FARM, &farms), vec![0]);
}

#[tokio::test]
async fn test_opt_in_cascade_keeps_references_resolving() {
    let store = CollectionStore::new(create_backend(
        std::path::Path::new("unused"),
        Some(BackendType::Memory),
    )
    .unwrap());

    let mut form = CropForm::starting_on(NaiveDate::from_ymd_opt(2024, 2, 10).unwrap());
    form.rice_type = "Arroz Tipo 2".into();
    form.area = "4".into();
    form.area_unit = "hectareas".into();
    form.select_farm("Finca A");
    form.select_plot("Lote 1");

    store.save(&farms()).await.unwrap();
    store
        .save(&[Plot::new("Lote 1", "2", "m2", "Norte", "Finca A")])
        .await
        .unwrap();
    store.save(&[form.build()]).await.unwrap();

    let plots: Vec<Plot> = store.load().await.unwrap();
    let crops: Vec<Crop> = store.load().await.unwrap();
    let (plots, crops) = cascade_farm_rename(&plots, &crops, "Finca A", "Finca Z");
    store.save(&plots).await.unwrap();
    store.save(&crops).await.unwrap();

    let crops: Vec<Crop> = store.load().await.unwrap();
    assert_eq!(crops[0].farm, "Finca Z");
    assert_eq!(crops[0].plot, "Lote 1");
    assert_eq!(
        crops[0].start_date,
        NaiveDate::from_ymd_opt(2024, 2, 10).unwrap()
    );
}

#[tokio::test]
async fn test_concurrent_saves_leave_one_whole_collection() {
    let temp_dir = TempDir::new().unwrap();
    let store = CollectionStore::new(Arc::new(FileBackend::new(temp_dir.path())));

    let first: Vec<Variety> = (0..50)
        .map(|i| Variety::new(format!("A{}", i), "primera"))
        .collect();
    let second: Vec<Variety> = (0..80)
        .map(|i| Variety::new(format!("B{}", i), "segunda"))
        .collect();

    let (a, b) = tokio::join!(store.save(&first), store.save(&second));
    a.unwrap();
    b.unwrap();

    let stored: Vec<Variety> = store.load().await.unwrap();
    assert!(stored == first || stored == second);
}

#[tokio::test]
async fn test_corrupt_file_is_recovered_as_empty() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("roles.json");
    std::fs::write(path, "[{\"roleName\":").unwrap();
    let store = CollectionStore::new(Arc::new(FileBackend::new(temp_dir.path())));

    assert!(matches!(
        store.load::<Role>().await,
        Err(FincaError::Deserialization { .. })
    ));

    let (mut editor, status) = CollectionEditor::<Role>::open(store.clone()).await;
    assert!(status.is_recovered());
    assert!(!status.is_unreadable());
    assert!(editor.is_empty());

    // Saving over the corrupt value replaces it
    let role = RoleForm::new("Operario", "Campo")
        .build(editor.records(), None)
        .unwrap();
    editor.submit(role).await.unwrap();

    let outcome = store.load_or_empty::<Role>().await;
    assert!(matches!(outcome.status, LoadStatus::Loaded));
    assert_eq!(outcome.records[0].name, "Operario 1");
}
