//! End-to-end snapshot behavior: compiling a description and reading a
//! language's lexicon back at chosen points in time.

use chronlang::compiler::compile_module;
use chronlang::resolver::MockResolver;
use chronlang::Module;

const INVENTORY: &str = "\
trait Voicing { *voiceless, voiced }
trait Place { bilabial, alveolar, palatal, velar }
trait Manner { stop, fricative, affricate, nasal }
class C encodes (Voicing, Place, Manner) {
  p = (voiceless, bilabial, stop),
  t = (voiceless, alveolar, stop),
  k = (voiceless, velar, stop),
  c = (voiceless, palatal, stop),
  g = (voiced, velar, stop),
  s = (voiceless, alveolar, fricative),
  ʃ = (voiceless, palatal, fricative),
  x = (voiceless, velar, fricative),
  tʃ = (voiceless, palatal, affricate),
  m = (voiced, bilabial, nasal),
  n = (voiced, alveolar, nasal),
}
trait Height { *mid, high, low }
trait Backness { *front, back }
trait Nasality { *oral, nasalized }
class V encodes (Height, Backness, Nasality) {
  i = (high, front, oral),
  e = (mid, front, oral),
  a = (low, front, oral),
  o = (mid, back, oral),
  u = (high, back, oral),
  õ = (mid, back, nasalized),
}
";

fn compile(body: &str) -> Module {
    let source = format!("{}{}", INVENTORY, body);
    let module = compile_module(&source, "test", &MockResolver::new());
    assert!(module.errors.is_empty(), "compile errors: {:?}", module.errors);
    module
}

fn rendered(module: &Module, language: &str, time: f64, gloss: &str) -> String {
    let snapshot = module.snapshot(language, time);
    assert!(snapshot.ok(), "snapshot errors: {:?}", snapshot.errors);
    snapshot
        .word(gloss)
        .unwrap_or_else(|| panic!("word '{}' missing from snapshot", gloss))
        .render(module)
}

#[test]
fn words_before_any_change_render_as_declared() {
    let module = compile("lang ON : Old Norse\n@ 1350, ON\n- I /ek/\n");
    assert_eq!(rendered(&module, "ON", 1350.0, "I"), "ek");
}

#[test]
fn a_change_applies_from_its_milestone_on() {
    let module = compile(
        "lang ON : Old Norse\n\
         @ 1350, ON\n\
         - I /ek/\n\
         @ 1500, ON\n\
         $ k > ʃ\n",
    );
    assert_eq!(rendered(&module, "ON", 1600.0, "I"), "eʃ");
    // before the change's window opens, the word is untouched
    assert_eq!(rendered(&module, "ON", 1400.0, "I"), "ek");
}

#[test]
fn words_are_visible_to_descendants_not_ancestors() {
    let module = compile(
        "lang ON : Old Norse\n\
         lang EI < ON\n\
         lang IC < EI\n\
         @ 2000, IC\n\
         - also /otʃõ/\n",
    );
    let early = module.snapshot("EI", 1900.0);
    assert!(early.word("also").is_none());
    let icelandic = module.snapshot("IC", 2000.0);
    assert!(icelandic.word("also").is_some());
    // the ancestor never sees a descendant's word
    let norse = module.snapshot("ON", 2000.0);
    assert!(norse.word("also").is_none());
}

#[test]
fn chained_changes_feed_each_other_in_declaration_order() {
    let module = compile(
        "lang ON : Old Norse\n\
         @ 1350, ON\n\
         - I /ek/\n\
         $ k > ʃ\n\
         $ ʃ > tʃ\n",
    );
    assert_eq!(rendered(&module, "ON", 1400.0, "I"), "etʃ");
}

#[test]
fn anchored_deletion_only_hits_the_word_edge() {
    let module = compile(
        "lang ON : Old Norse\n\
         @ 1350, ON\n\
         - cook /kek/\n\
         $ k > [] / _#\n",
    );
    assert_eq!(rendered(&module, "ON", 1400.0, "cook"), "ke");
}

#[test]
fn feature_modification_resolves_within_the_class() {
    let module = compile(
        "lang ON : Old Norse\n\
         @ 1350, ON\n\
         - I /ek/\n\
         $ [C+velar] > [+palatal]\n",
    );
    // /k/ is (voiceless, velar, stop); palatal substituted gives /c/
    assert_eq!(rendered(&module, "ON", 1400.0, "I"), "ec");
}

#[test]
fn unresolvable_modification_warns_and_keeps_the_phoneme() {
    let module = compile(
        "lang ON : Old Norse\n\
         @ 1350, ON\n\
         - go /ge/\n\
         $ [C+velar] > [+palatal]\n",
    );
    // /g/ is (voiced, velar, stop); no voiced palatal stop exists
    let snapshot = module.snapshot("ON", 1400.0);
    assert!(snapshot.ok());
    assert_eq!(snapshot.word("go").unwrap().render(&module), "ge");
    assert!(snapshot
        .warnings
        .iter()
        .any(|w| w.code == "unresolved_modification"));
    // the module itself stays clean; warnings belong to the snapshot
    assert!(module.warnings.is_empty());
}

#[test]
fn changes_sort_by_start_time_not_declaration_order() {
    let module = compile(
        "lang ON : Old Norse\n\
         @ 1350, ON\n\
         - go /ka/\n\
         @ 1500, ON\n\
         $ s > ʃ\n\
         @ 1400, ON\n\
         $ k > s\n",
    );
    // 1400: k > s, then 1500: s > ʃ, regardless of document order
    assert_eq!(rendered(&module, "ON", 1600.0, "go"), "ʃa");
}

#[test]
fn equal_start_times_fall_back_to_declaration_order() {
    let module = compile(
        "lang ON : Old Norse\n\
         @ 1350, ON\n\
         - go /ka/\n\
         $ k > s\n\
         $ s > t\n",
    );
    assert_eq!(rendered(&module, "ON", 1400.0, "go"), "ta");
}

#[test]
fn snapshot_does_not_mutate_the_module() {
    let module = compile(
        "lang ON : Old Norse\n\
         @ 1350, ON\n\
         - I /ek/\n\
         $ k > ʃ\n",
    );
    let before = module.words["I"].phonemes.clone();
    let snapshot = module.snapshot("ON", 1400.0);
    assert_eq!(snapshot.word("I").unwrap().render(&module), "eʃ");
    assert_eq!(module.words["I"].phonemes, before);
    assert_eq!(module.words["I"].render(&module), "ek");
}

#[test]
fn etymology_records_every_effective_change() {
    let module = compile(
        "lang ON : Old Norse\n\
         @ 1350, ON\n\
         - I /ek/\n\
         $ k > ʃ\n\
         $ ʃ > tʃ\n\
         $ p > t\n",
    );
    let snapshot = module.snapshot("ON", 1400.0);
    let word = snapshot.word("I").unwrap();
    // two changes touched the word; the /p/ rule did not
    assert_eq!(word.etymology.len(), 2);
    // most recent first: the eʃ form, then the declared ek form
    assert_eq!(word.etymology[0].predecessor.render(&module), "eʃ");
    assert_eq!(word.etymology[1].predecessor.render(&module), "ek");
    assert!(word.etymology[1].predecessor.etymology.is_empty());
}

#[test]
fn word_time_windows_bound_visibility() {
    let module = compile(
        "lang ON : Old Norse\n\
         @ 1350-1500, ON\n\
         - I /ek/\n",
    );
    assert!(module.snapshot("ON", 1400.0).word("I").is_some());
    assert!(module.snapshot("ON", 1200.0).word("I").is_none());
    assert!(module.snapshot("ON", 1600.0).word("I").is_none());
}

#[test]
fn epenthesis_applies_between_phonemes() {
    let module = compile(
        "lang ON : Old Norse\n\
         @ 1350, ON\n\
         - stone /tin/\n\
         $ [] > e / #_t\n",
    );
    assert_eq!(rendered(&module, "ON", 1400.0, "stone"), "etin");
}

#[test]
fn environment_with_class_context() {
    let module = compile(
        "lang ON : Old Norse\n\
         @ 1350, ON\n\
         - echo /eke/\n\
         - creek /kek/\n\
         $ k > g / V_V\n",
    );
    assert_eq!(rendered(&module, "ON", 1400.0, "echo"), "ege");
    // only the intervocalic k voices
    assert_eq!(rendered(&module, "ON", 1400.0, "creek"), "kek");
}

#[test]
fn snapshot_of_unknown_language_reports_an_error() {
    let module = compile("lang ON : Old Norse\n@ 1350, ON\n- I /ek/\n");
    let snapshot = module.snapshot("XX", 1400.0);
    assert!(!snapshot.ok());
    assert!(snapshot.errors.iter().any(|e| e.code == "unknown_language"));
    assert!(snapshot.words.is_empty());
}

#[test]
fn compiling_twice_is_deterministic() {
    let source = format!(
        "{}{}",
        INVENTORY,
        "lang ON : Old Norse\n@ 1350, ON\n- I /ek/\n$ k > ʃ\n"
    );
    let first = compile_module(&source, "test", &MockResolver::new());
    let second = compile_module(&source, "test", &MockResolver::new());
    assert_eq!(first, second);
}
