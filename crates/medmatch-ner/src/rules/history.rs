//! Comorbidity and allergy rules.

use medmatch_common::{EntityType, Language};
use regex::Captures;

use super::{term, title_case, PatternRule, Qualifier, ValueTemplate};

use EntityType::{Allergy, Comorbidity};
use Language::{Any, En, It};

pub(super) fn comorbidity_rules() -> Vec<PatternRule> {
    const CONDITIONS: &[(&str, Language, &str)] = &[
        ("Type 2 Diabetes", En, r"type\s*(?:2|ii)\s+diabetes(?:\s+mellitus)?|T2DM|NIDDM"),
        ("Type 2 Diabetes", It, r"diabete\s+(?:mellito\s+)?(?:di\s+)?tipo\s*(?:2|ii)"),
        ("Diabetes", En, r"diabetes(?:\s+mellitus)?|diabetic"),
        ("Diabetes", It, r"diabete(?:\s+mellito)?|diabetic[oa]"),
        ("Hypertension", En, r"(?:arterial\s+|essential\s+)?hypertension|hypertensive|high\s+blood\s+pressure"),
        ("Hypertension", It, r"ipertensione(?:\s+arteriosa)?|ipertes[oa]"),
        ("COPD", En, r"COPD|chronic\s+obstructive\s+pulmonary\s+disease|emphysema"),
        ("COPD", It, r"BPCO|broncopneumopatia\s+cronica\s+ostruttiva|enfisema"),
        ("Heart Failure", En, r"(?:congestive\s+)?heart\s+failure"),
        ("Heart Failure", It, r"scompenso\s+cardiaco|insufficienza\s+cardiaca"),
        ("Coronary Artery Disease", En, r"coronary\s+artery\s+disease|ischemic\s+heart\s+disease|myocardial\s+infarction"),
        ("Coronary Artery Disease", It, r"cardiopatia\s+ischemica|infarto\s+(?:del\s+)?miocardi(?:o|co)|coronaropatia"),
        ("Atrial Fibrillation", En, r"atrial\s+fibrillation"),
        ("Atrial Fibrillation", It, r"fibrillazione\s+atriale"),
        ("Chronic Kidney Disease", En, r"chronic\s+kidney\s+disease|renal\s+(?:insufficiency|failure)"),
        ("Chronic Kidney Disease", It, r"insufficienza\s+renale(?:\s+cronica)?|malattia\s+renale\s+cronica|IRC"),
        ("Hepatitis B", En, r"hepatitis\s+B|HBV"),
        ("Hepatitis B", It, r"epatite\s+B"),
        ("Hepatitis C", En, r"hepatitis\s+C|HCV"),
        ("Hepatitis C", It, r"epatite\s+C"),
        ("HIV", Any, r"HIV(?:\s+infection)?|infezione\s+da\s+HIV"),
        ("Autoimmune Disease", En, r"autoimmune\s+(?:disease|disorder|condition)"),
        ("Autoimmune Disease", It, r"(?:malattia|patologia)\s+autoimmune"),
        ("Rheumatoid Arthritis", En, r"rheumatoid\s+arthritis"),
        ("Rheumatoid Arthritis", It, r"artrite\s+reumatoide"),
        ("Lupus", Any, r"(?:systemic\s+)?lupus(?:\s+erythematosus|\s+eritematoso(?:\s+sistemico)?)?"),
        ("Inflammatory Bowel Disease", En, r"crohn'?s\s+disease|ulcerative\s+colitis|inflammatory\s+bowel\s+disease"),
        ("Inflammatory Bowel Disease", It, r"morbo\s+di\s+crohn|(?:retto)?colite\s+ulcerosa"),
        ("Interstitial Lung Disease", En, r"interstitial\s+lung\s+disease|pneumonitis|pulmonary\s+fibrosis"),
        ("Interstitial Lung Disease", It, r"interstiziopatia\s+polmonare|polmonite\s+interstiziale|fibrosi\s+polmonare"),
        ("Hypothyroidism", En, r"hypothyroidism"),
        ("Hypothyroidism", It, r"ipotiroidismo"),
        ("Obesity", En, r"obesity|obese"),
        ("Obesity", It, r"obesita|obes[oa]"),
        ("Asthma", En, r"asthma"),
        ("Asthma", It, r"asma"),
        ("Depression", En, r"depression|major\s+depressive\s+disorder"),
        ("Depression", It, r"depressione|sindrome\s+depressiva"),
        ("Osteoporosis", En, r"osteoporosis"),
        ("Osteoporosis", It, r"osteoporosi"),
        ("Dyslipidemia", En, r"dyslipid(?:a)?emia|hypercholesterol(?:a)?emia"),
        ("Dyslipidemia", It, r"dislipidemia|ipercolesterolemia"),
    ];
    CONDITIONS
        .iter()
        .map(|(canonical, language, alternatives)| {
            term(Comorbidity, *language, canonical, alternatives).qualified(Qualifier::Negatable)
        })
        .collect()
}

pub(super) fn allergy_rules() -> Vec<PatternRule> {
    vec![
        term(
            Allergy,
            En,
            "None known",
            r"no\s+known\s+(?:drug\s+)?allergies|no\s+allergies|denies\s+(?:any\s+)?allergies",
        ),
        term(
            Allergy,
            It,
            "None known",
            r"nessuna\s+allergia(?:\s+nota)?|allergie\s+(?:negative|non\s+note)|non\s+(?:riferisce\s+|presenta\s+)?allergie|nega\s+allergie",
        ),
        PatternRule::new(
            Allergy,
            En,
            r"(?i)\ballerg(?:y|ies|ic)\s*:?\s*(?:to\s+)?([a-z][a-z\-]{2,})",
            ValueTemplate::Derive(allergen),
        )
        .qualified(Qualifier::Negatable),
        PatternRule::new(
            Allergy,
            It,
            r"(?i)\ballergi(?:a|e|co|ca|ci|che)\s*:?\s*(?:(?:alla|alle|allo|agli|ai|al|a)\s+|all'\s*|verso\s+(?:la\s+|il\s+|i\s+|le\s+|gli\s+)?)?([a-z][a-z\-]{2,})",
            ValueTemplate::Derive(allergen),
        )
        .qualified(Qualifier::Negatable),
    ]
}

/// Canonical allergen name, or `None` for filler words ("allergies: none").
fn allergen(caps: &Captures<'_>) -> Option<String> {
    let word = caps.get(1)?.as_str().to_lowercase();
    let canonical = match word.as_str() {
        "none" | "nessuna" | "negative" | "negativa" | "known" | "note" | "nota" | "and" | "the"
        | "drug" | "drugs" | "farmaci" | "farmacologiche" | "reactions" | "history" | "non" => {
            return None
        }
        w if w.starts_with("penicillin") => "Penicillin",
        w if w.starts_with("amoxicillin") => "Amoxicillin",
        w if w.starts_with("sulfa") || w.starts_with("sulfamid") || w.starts_with("sulfonamid") => {
            "Sulfonamides"
        }
        "iodine" | "iodinated" | "iodio" | "iodati" | "contrast" | "mezzo" | "mezzi" => {
            "Iodinated Contrast"
        }
        "latex" | "lattice" => "Latex",
        "nsaids" | "nsaid" | "fans" => "NSAIDs",
        "aspirin" | "aspirina" => "Aspirin",
        "codeine" | "codeina" => "Codeine",
        "morphine" | "morfina" => "Morphine",
        "peanuts" | "peanut" | "arachidi" => "Peanuts",
        "shellfish" | "crostacei" => "Shellfish",
        "nickel" | "nichel" => "Nickel",
        "pollen" | "pollini" | "graminacee" => "Pollen",
        "cefalosporine" | "cephalosporins" => "Cephalosporins",
        w => return Some(title_case(w)),
    };
    Some(canonical.to_string())
}
