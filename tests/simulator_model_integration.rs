mod common;

use kim_collections::api::{
    CollectionItemType, EmbeddedFile, Error, ErrorKind, LibraryContents, SimulatorModel,
};

use common::{Fixture, SIM_SPEC, simulator_model};

const SM: CollectionItemType = CollectionItemType::SimulatorModel;

fn install_sim(fx: &Fixture, contents: LibraryContents) {
    fx.install(&fx.system_dir(SM), SM, contents);
}

fn create(fx: &Fixture, name: &str) -> Result<SimulatorModel, Error> {
    SimulatorModel::create(name, fx.env.clone(), fx.loader())
}

fn scratch_entries(fx: &Fixture) -> usize {
    std::fs::read_dir(fx.env.scratch())
        .map(|entries| entries.count())
        .unwrap_or(0)
}

fn field_index(model: &SimulatorModel, name: &str) -> usize {
    (0..model.number_of_simulator_fields())
        .find(|index| model.simulator_field_metadata(*index).expect("metadata").1 == name)
        .expect("field present")
}

#[test]
fn create_extracts_files_and_reads_the_specification() {
    let fx = Fixture::new();
    install_sim(&fx, simulator_model("Sim_LJ", SIM_SPEC));
    let model = create(&fx, "Sim_LJ").expect("create");

    assert_eq!(model.simulator_name_and_version(), ("LAMMPS", "12 Dec 2018"));
    assert_eq!(model.number_of_supported_species(), 2);
    assert_eq!(model.supported_species(1).unwrap(), "Ne");
    assert_eq!(model.supported_species(2).unwrap_err().kind(), ErrorKind::Usage);

    let dir = model.parameter_file_directory_name().to_path_buf();
    assert!(dir.starts_with(fx.env.scratch()));
    assert_eq!(model.specification_file_name(), "smspec.edn");
    assert_eq!(model.number_of_parameter_files(), 1);
    assert_eq!(model.parameter_file_basename(0).unwrap(), "params.txt");
    assert_eq!(
        std::fs::read_to_string(model.parameter_file_path(0).unwrap()).unwrap(),
        "epsilon 1.0\n"
    );
    assert_eq!(std::fs::read_to_string(dir.join("smspec.edn")).unwrap(), SIM_SPEC);

    let units = field_index(&model, "units");
    assert_eq!(model.simulator_field_metadata(units).unwrap(), (1, "units"));
    let init = field_index(&model, "model-init");
    assert_eq!(model.simulator_field_metadata(init).unwrap().0, 4);

    drop(model);
    assert!(!dir.exists(), "parameter file directory removed on drop");
}

#[test]
fn template_map_substitutes_field_lines_after_close() {
    let fx = Fixture::new();
    install_sim(&fx, simulator_model("Sim_LJ", SIM_SPEC));
    let mut model = create(&fx, "Sim_LJ").expect("create");
    let init = field_index(&model, "model-init");

    assert!(model.template_map_is_open());
    assert_eq!(model.simulator_field_line(init, 1).unwrap_err().kind(), ErrorKind::Misuse);

    model.add_template_map("sim-key", "42").expect("add key");
    model.close_template_map();
    assert!(!model.template_map_is_open());
    assert_eq!(model.simulator_field_line(init, 0).unwrap(), "pair_style lj/cut 8.0");
    assert_eq!(model.simulator_field_line(init, 1).unwrap(), "file: params.txt");
    let expected_path = model.parameter_file_path(0).unwrap();
    assert_eq!(
        model.simulator_field_line(init, 2).unwrap(),
        format!("path: {}", expected_path.display())
    );
    assert_eq!(model.simulator_field_line(init, 3).unwrap(), "custom: 42");
    assert_eq!(model.simulator_field_line(init, 4).unwrap_err().kind(), ErrorKind::Usage);

    model.open_and_initialize_template_map();
    model.close_template_map();
    assert_eq!(model.simulator_field_line(init, 3).unwrap(), "custom: @<sim-key>@");
}

#[test]
fn template_keys_are_validated_and_closed_maps_reject_additions() {
    let fx = Fixture::new();
    install_sim(&fx, simulator_model("Sim_LJ", SIM_SPEC));
    let mut model = create(&fx, "Sim_LJ").expect("create");

    assert_eq!(
        model.add_template_map("Bad Key!", "x").unwrap_err().kind(),
        ErrorKind::Usage
    );
    model.add_template_map("bad-key-1", "x").expect("valid key");
    model.close_template_map();
    assert_eq!(
        model.add_template_map("bad-key-1", "y").unwrap_err().kind(),
        ErrorKind::Misuse
    );
}

#[test]
fn unsupported_schema_version_leaves_nothing_behind() {
    let fx = Fixture::new();
    let spec = SIM_SPEC.replace("\"kim-api-sm-schema-version\" 1", "\"kim-api-sm-schema-version\" 2");
    install_sim(&fx, simulator_model("Sim_LJ", &spec));

    let err = create(&fx, "Sim_LJ").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
    assert_eq!(err.item(), Some("Sim_LJ"));
    assert_eq!(scratch_entries(&fx), 0);
}

#[test]
fn mismatched_model_name_is_malformed() {
    let fx = Fixture::new();
    install_sim(&fx, simulator_model("Other_Name", SIM_SPEC));

    let err = create(&fx, "Other_Name").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
    assert_eq!(scratch_entries(&fx), 0);
}

#[test]
fn only_simulator_model_libraries_can_be_created() {
    let fx = Fixture::new();
    let contents = LibraryContents::new(CollectionItemType::PortableModel, "Sneaky")
        .with_specification_file(EmbeddedFile::new("smspec.edn", SIM_SPEC));
    install_sim(&fx, contents);

    let err = create(&fx, "Sneaky").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
    assert_eq!(err.message(), Some("Creation of a portable model is not allowed."));
}

#[test]
fn missing_models_are_not_found() {
    let fx = Fixture::new();
    let err = create(&fx, "Absent").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn summary_reports_the_loaded_model() {
    let fx = Fixture::new();
    install_sim(&fx, simulator_model("Sim_LJ", SIM_SPEC));
    let model = create(&fx, "Sim_LJ").expect("create");

    let summary = model.summary_json();
    assert_eq!(summary["simulator_model_name"], "Sim_LJ");
    assert_eq!(summary["simulator_name"], "LAMMPS");
    assert_eq!(summary["parameter_files"][0], "params.txt");
    assert_eq!(summary["template_map_open"], true);
    assert_eq!(summary["template_map"]["parameter-file-basename-1"], "params.txt");
}
