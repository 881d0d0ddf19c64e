//! Oncology treatment and concomitant medication lexicons.

use medmatch_common::{EntityType, Language};

use super::{term, PatternRule};

use EntityType::{Medication, Treatment};
use Language::{Any, En, It};

/// Procedures and therapy classes, then named anticancer agents.
pub(super) fn treatment_rules() -> Vec<PatternRule> {
    let mut rules = vec![
        // Surgery
        term(Treatment, En, "Lumpectomy", r"lumpectomy|breast[-\s]conserving\s+surgery|wide\s+local\s+excision"),
        term(Treatment, It, "Lumpectomy", r"tumorectomia|nodulectomia|chirurgia\s+conservativa"),
        term(Treatment, En, "Quadrantectomy", r"quadrantectomy"),
        term(Treatment, It, "Quadrantectomy", r"quadrantectomia"),
        term(Treatment, En, "Mastectomy", r"(?:modified\s+radical\s+|radical\s+|bilateral\s+)?mastectomy"),
        term(Treatment, It, "Mastectomy", r"mastectomia"),
        term(Treatment, En, "Lobectomy", r"lobectomy"),
        term(Treatment, It, "Lobectomy", r"lobectomia"),
        term(Treatment, En, "Pneumonectomy", r"pneumonectomy"),
        term(Treatment, It, "Pneumonectomy", r"pneumonectomia"),
        term(Treatment, En, "Whipple Procedure", r"whipple(?:\s+procedure)?|pancreaticoduodenectomy"),
        term(Treatment, It, "Whipple Procedure", r"duodenocefalopancreasectomia|intervento\s+(?:sec\.?\s*|secondo\s+)?whipple"),
        term(Treatment, En, "Colectomy", r"(?:hemi|sigmoid\s+)?colectomy|(?:low\s+)?anterior\s+resection"),
        term(Treatment, It, "Colectomy", r"(?:emi)?colectomia|resezione\s+anteriore(?:\s+del\s+retto)?"),
        term(Treatment, En, "Prostatectomy", r"(?:radical\s+)?prostatectomy"),
        term(Treatment, It, "Prostatectomy", r"prostatectomia(?:\s+radicale)?"),
        term(Treatment, En, "Surgery", r"surgery|surgical\s+resection|resected"),
        term(Treatment, It, "Surgery", r"intervento\s+chirurgico|chirurgia|resezione\s+chirurgica|operat[oa]"),
        // Systemic and radiation therapy classes
        term(Treatment, En, "Chemotherapy", r"(?:neo)?adjuvant\s+chemotherapy|chemotherapy|systemic\s+therapy"),
        term(Treatment, It, "Chemotherapy", r"chemioterapia(?:\s+(?:neo)?adiuvante)?|terapia\s+sistemica"),
        term(Treatment, En, "Radiotherapy", r"radiotherapy|radiation(?:\s+therapy)?|irradiation|SBRT|stereotactic\s+body\s+radiation"),
        term(Treatment, It, "Radiotherapy", r"radioterapia|radioterapico|irradiazione"),
        term(Treatment, En, "Immunotherapy", r"immunotherapy|checkpoint\s+inhibitors?"),
        term(Treatment, It, "Immunotherapy", r"immunoterapia|inibitori?\s+(?:dei\s+)?checkpoint"),
        term(Treatment, En, "Hormone Therapy", r"hormon(?:e|al)\s+therapy|endocrine\s+therapy|aromatase\s+inhibitors?"),
        term(Treatment, It, "Hormone Therapy", r"ormonoterapia|terapia\s+(?:ormonale|endocrina)|inibitori?\s+dell'\s*aromatasi"),
        term(Treatment, En, "Targeted Therapy", r"targeted\s+therapy|tyrosine\s+kinase\s+inhibitors?|TKI"),
        term(Treatment, It, "Targeted Therapy", r"terapia\s+(?:a\s+bersaglio(?:\s+molecolare)?|target)|inibitori?\s+(?:di\s+)?tirosin[- ]?chinasi"),
    ];

    // Anticancer agents carry the same name in both languages up to suffixes.
    const AGENTS: &[(&str, &str)] = &[
        ("Pembrolizumab", "pembrolizumab|keytruda"),
        ("Nivolumab", "nivolumab|opdivo"),
        ("Atezolizumab", "atezolizumab"),
        ("Durvalumab", "durvalumab"),
        ("Ipilimumab", "ipilimumab"),
        ("Carboplatin", "carboplatin[oa]?"),
        ("Cisplatin", "cisplatin[oa]?"),
        ("Oxaliplatin", "oxaliplatin[oa]?"),
        ("Paclitaxel", "(?:nab-)?paclitaxel"),
        ("Docetaxel", "docetaxel"),
        ("Gemcitabine", "gemcitabin[ae]"),
        ("Capecitabine", "capecitabin[ae]"),
        ("Fluorouracil", "5-?FU|(?:5-)?fluorouracil[e]?"),
        ("FOLFOX", "FOLFOX(?:-?[46])?"),
        ("FOLFIRI", "FOLFIRI"),
        ("FOLFIRINOX", "(?:m)?FOLFIRINOX"),
        ("Doxorubicin", "doxorubicin[a]?|adriamycin[a]?"),
        ("Cyclophosphamide", "cyclophosphamide|ciclofosfamide"),
        ("Trastuzumab", "trastuzumab(?:\\s+deruxtecan)?|herceptin"),
        ("Pertuzumab", "pertuzumab"),
        ("Tamoxifen", "tamoxifen[e]?"),
        ("Letrozole", "letrozol[eo]"),
        ("Anastrozole", "anastrozol[eo]"),
        ("Exemestane", "exemestan[eo]"),
        ("Fulvestrant", "fulvestrant"),
        ("Palbociclib", "palbociclib"),
        ("Ribociclib", "ribociclib"),
        ("Abemaciclib", "abemaciclib"),
        ("Olaparib", "olaparib"),
        ("Osimertinib", "osimertinib"),
        ("Erlotinib", "erlotinib"),
        ("Gefitinib", "gefitinib"),
        ("Alectinib", "alectinib"),
        ("Sotorasib", "sotorasib"),
        ("Adagrasib", "adagrasib"),
        ("Bevacizumab", "bevacizumab"),
        ("Cetuximab", "cetuximab"),
        ("Panitumumab", "panitumumab"),
        ("Enzalutamide", "enzalutamide"),
        ("Abiraterone", "abirateron[ea]?"),
    ];
    rules.extend(
        AGENTS
            .iter()
            .map(|(canonical, alternatives)| term(Treatment, Any, canonical, alternatives)),
    );
    rules
}

/// Non-oncology medications (chronic and supportive therapy).
pub(super) fn medication_rules() -> Vec<PatternRule> {
    const MEDICATIONS: &[(&str, &str)] = &[
        ("Metformin", "metformin[a]?"),
        ("Insulin", "insulin[a]?"),
        ("Ramipril", "ramipril"),
        ("Lisinopril", "lisinopril"),
        ("Enalapril", "enalapril"),
        ("Amlodipine", "amlodipin[ae]"),
        ("Bisoprolol", "bisoprolol[o]?"),
        ("Metoprolol", "metoprolol[o]?"),
        ("Atorvastatin", "atorvastatin[a]?"),
        ("Rosuvastatin", "rosuvastatin[a]?"),
        ("Simvastatin", "simvastatin[a]?"),
        ("Aspirin", "aspirin[a]?|cardioaspirin[a]?|acetylsalicylic\\s+acid|acido\\s+acetilsalicilico"),
        ("Warfarin", "warfarin[a]?|coumadin"),
        ("Apixaban", "apixaban"),
        ("Rivaroxaban", "rivaroxaban"),
        ("Levothyroxine", "levothyroxine|levotiroxina|eutirox"),
        ("Omeprazole", "omeprazol[eo]"),
        ("Pantoprazole", "pantoprazol[eo]"),
        ("Furosemide", "furosemide|lasix"),
        ("Hydrochlorothiazide", "hydrochlorothiazide|idroclorotiazide"),
        ("Losartan", "losartan"),
        ("Valsartan", "valsartan"),
        ("Prednisone", "prednisone"),
        ("Dexamethasone", "dexamethasone|desametasone"),
        ("Ondansetron", "ondansetron[e]?"),
        ("Paracetamol", "paracetamol[o]?|acetaminophen|tachipirina"),
        ("Salbutamol", "salbutamol[o]?|albuterol"),
        ("Sertraline", "sertralin[ae]"),
    ];
    MEDICATIONS
        .iter()
        .map(|(canonical, alternatives)| term(Medication, Any, canonical, alternatives))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical_hits(rules: &[PatternRule], text: &str) -> Vec<String> {
        rules
            .iter()
            .filter(|rule| rule.pattern.is_match(text))
            .filter_map(|rule| {
                let caps = rule.pattern.captures(text)?;
                rule.value.render(&caps)
            })
            .collect()
    }

    #[test]
    fn test_italian_procedures() {
        let rules = treatment_rules();
        assert_eq!(canonical_hits(&rules, "sottoposta a quadrantectomia"), vec!["Quadrantectomy"]);
        assert_eq!(canonical_hits(&rules, "ciclo di chemioterapia adiuvante"), vec!["Chemotherapy"]);
    }

    #[test]
    fn test_agent_suffixes() {
        let rules = treatment_rules();
        assert_eq!(canonical_hits(&rules, "carboplatino e paclitaxel"), vec!["Carboplatin", "Paclitaxel"]);
        assert_eq!(canonical_hits(&rules, "mFOLFIRINOX"), vec!["FOLFIRINOX"]);
    }

    #[test]
    fn test_medications_both_languages() {
        let rules = medication_rules();
        assert_eq!(canonical_hits(&rules, "metformina 500 mg"), vec!["Metformin"]);
        assert_eq!(canonical_hits(&rules, "takes aspirin daily"), vec!["Aspirin"]);
    }
}
