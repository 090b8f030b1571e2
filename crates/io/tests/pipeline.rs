use std::fs;
use std::path::Path;

use lcigrid_core::{ExchangeKind, Key};
use lcigrid_io::store::load_registry;
use lcigrid_io::{lci_matrices_to_excel, DataPackage, LciBundle, MetadataStore, MigrationDir};
use lcigrid_recon::{Importer, MigrationTable};

fn write_fixture(dir: &Path) {
    fs::write(
        dir.join("datapackage.json"),
        r#"{"name": "mini-hiot", "resources": [
            {"name": "activities", "path": "activities.csv"},
            {"name": "products", "path": "products.csv"},
            {"name": "extensions", "path": "extensions.csv"},
            {"name": "production-exchanges", "path": "production.csv"},
            {"name": "extension-exchanges", "path": "extension.csv"},
            {"name": "hiot", "path": "hiot.csv"}
        ]}"#,
    )
    .unwrap();
    fs::write(
        dir.join("activities.csv"),
        "id,name,location\nA_PADDY,Cultivation of paddy rice,AT\nA_STEEL,Manufacture of basic iron and steel,DE\n",
    )
    .unwrap();
    fs::write(dir.join("products.csv"), "id,name,unit\nC_PADDY,Paddy rice,tonnes\nC_STEEL,Basic iron,tonnes\n").unwrap();
    fs::write(
        dir.join("extensions.csv"),
        "id,name,compartment,unit\nE1,\"Carbon dioxide, fossil\",air,kg\nE2,Lead ores,water,kg\nE3,Employment,,1000 p\n",
    )
    .unwrap();
    fs::write(
        dir.join("production.csv"),
        "row,col,amount\nC_PADDY,A_PADDY,\nC_STEEL,A_STEEL,2.5\n",
    )
    .unwrap();
    fs::write(
        dir.join("extension.csv"),
        "row,col,amount\nE1,A_PADDY,0.8\nE2,A_STEEL,10\nE3,A_STEEL,\n",
    )
    .unwrap();
    fs::write(dir.join("hiot.csv"), "row,col,amount\nC_PADDY,A_STEEL,-0.01\n").unwrap();

    let migrations = dir.join("migrations");
    fs::create_dir(&migrations).unwrap();
    fs::write(
        migrations.join("exiobase-3-ecoinvent-3.6.json"),
        r#"{"fields": ["name", "categories"], "data": [
            [["Carbon dioxide, fossil", "air"], {"categories": ["air", "non-urban air or from high stacks"]}],
            [["Lead ores", "water"], [
                {"name": "Lead", "amount": 0.25},
                {"name": "Lead", "categories": ["water", "ground-"], "amount": 0.75}
            ]]
        ]}"#,
    )
    .unwrap();

    fs::write(
        dir.join("biosphere3.json"),
        r#"[
            {"name": "Carbon dioxide, fossil", "categories": ["air", "non-urban air or from high stacks"],
             "code": "aa7cac3a", "unit": "kilogram", "type": "emission"},
            {"name": "Lead", "categories": ["water"], "code": "pb-w", "unit": "kilogram"},
            {"name": "Lead", "categories": ["water", "ground-"], "code": "pb-gw", "unit": "kilogram"}
        ]"#,
    )
    .unwrap();
}

#[test]
fn import_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());

    let package = DataPackage::open(dir.path()).unwrap();
    let store = MigrationDir::new(dir.path().join("migrations"));
    let migrations = MigrationTable::load(&store, "exiobase-3-ecoinvent-3.6").unwrap();
    let registry = load_registry(&dir.path().join("biosphere3.json"), "biosphere3").unwrap();

    let importer = Importer::new(&package, "EXIOBASE 3.3.17 hybrid", &migrations, &registry);
    let products = importer.products().unwrap();
    assert!(products.values().all(|p| p.unit.as_deref() == Some("ton")));

    let run = importer.run().unwrap();
    assert_eq!(run.datasets.len(), 2);
    assert_eq!(run.summary.unmigrated, 1);
    assert_eq!(run.summary.links, 3);

    let exchanges: Vec<_> = run.exchanges.collect::<Result<_, _>>().unwrap();
    let biosphere: Vec<_> = exchanges
        .iter()
        .filter(|e| e.kind == ExchangeKind::Biosphere)
        .collect();
    assert_eq!(biosphere.len(), 3);
    assert_eq!(biosphere[0].input, Key::new("biosphere3", "aa7cac3a"));
    assert_eq!(biosphere[0].amount, 0.8);
    assert_eq!(biosphere[1].input, Key::new("biosphere3", "pb-w"));
    assert_eq!(biosphere[1].amount, 2.5);
    assert_eq!(biosphere[2].input, Key::new("biosphere3", "pb-gw"));
    assert_eq!(biosphere[2].amount, 7.5);

    // Unmapped employment row with no amount produced nothing
    assert_eq!(exchanges.len(), 2 + 3 + 1);
    assert_eq!(exchanges[0].amount, 1.0);
    assert_eq!(exchanges.last().unwrap().amount, -0.01);
}

#[test]
fn export_bundle_to_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let store = MetadataStore::from_json(
        r#"{"databases": {
            "EXIOBASE 3.3.17 hybrid": [
                {"code": "A_PADDY", "name": "Cultivation of paddy rice", "location": "AT"},
                {"code": "C_PADDY", "name": "Paddy rice", "unit": "ton"}
            ],
            "biosphere3": [{"code": "aa7cac3a", "name": "Carbon dioxide, fossil", "unit": "kilogram",
                            "categories": ["air"]}]
        }}"#,
    )
    .unwrap();
    let bundle = LciBundle::from_json(
        r#"{
            "activity_dict": [[["EXIOBASE 3.3.17 hybrid", "A_PADDY"], 0]],
            "product_dict": [[["EXIOBASE 3.3.17 hybrid", "C_PADDY"], 0]],
            "biosphere_dict": [[["biosphere3", "aa7cac3a"], 0]],
            "technosphere_matrix": {"shape": [1, 1], "entries": [[0, 0, 1.0]]},
            "biosphere_matrix": {"shape": [1, 1], "entries": [[0, 0, 0.8]]}
        }"#,
    )
    .unwrap();

    let report =
        lci_matrices_to_excel(&bundle, &store, "EXIOBASE 3.3.17 hybrid", false, dir.path()).unwrap();
    assert_eq!(report.cells_written, 2);
    assert_eq!(report.pruned_flows, 0);

    let path = report.path.unwrap();
    assert_eq!(path.file_name().unwrap(), "EXIOBASE-3317-hybrid.xlsx");

    let archive = zip::ZipArchive::new(fs::File::open(&path).unwrap()).unwrap();
    let sheets = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet"))
        .count();
    assert_eq!(sheets, 4);
}
