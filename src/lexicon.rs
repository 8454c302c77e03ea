//! Static keyword tables used by the affiliation scorers.
//!
//! All entries are lower-case; matching is done against lower-cased input.

/// Substrings that point to an academic institution.
pub const ACADEMIC_KEYWORDS: &[&str] = &[
    "university",
    "college",
    "institute",
    "school",
    "laboratory",
    "lab",
    "research center",
    "research centre",
    "medical center",
    "medical centre",
    "hospital",
    "clinic",
    "department",
    "faculty",
    "academy",
    "polytechnic",
    "campus",
    "graduate school",
    "postgraduate",
    "doctoral",
    "phd program",
];

/// Substrings that point to a commercial organization.
pub const INDUSTRY_KEYWORDS: &[&str] = &[
    "pharma",
    "pharmaceutical",
    "biotech",
    "biotechnology",
    "therapeutics",
    "inc",
    "incorporated",
    "ltd",
    "limited",
    "llc",
    "corp",
    "corporation",
    "company",
    "co.",
    "gmbh",
    "ag",
    "sa",
    "plc",
    "pty",
    "pvt",
    "biosciences",
    "life sciences",
    "research and development",
    "r&d",
    "drug discovery",
    "clinical research",
    "contract research",
    "clinical trial",
    "clinical trials",
    "drug development",
    "drug design",
    "medical device",
    "diagnostics",
    "laboratory services",
    "consulting",
    "solutions",
    "technologies",
    "systems",
    "services",
    "group",
    "healthcare",
    "health care",
    "medical",
    "clinical",
    "trial",
    "cro",
    "contract research organization",
    "pharmaceutical research",
    "biomedical",
    "medicine",
    "therapy",
    "treatment",
    "device",
];

/// Named pharma, biotech, CRO and private-clinic organizations.
///
/// A hit here counts double compared to a generic industry keyword.
pub const KNOWN_COMPANIES: &[&str] = &[
    "pfizer",
    "roche",
    "novartis",
    "merck",
    "gsk",
    "glaxosmithkline",
    "sanofi",
    "astrazeneca",
    "bristol myers squibb",
    "johnson & johnson",
    "abbvie",
    "amgen",
    "gilead",
    "biogen",
    "regeneron",
    "vertex",
    "moderna",
    "biontech",
    "illumina",
    "thermo fisher",
    "agilent",
    "waters",
    "perkinelmer",
    "danaher",
    "abbott",
    "medtronic",
    "boston scientific",
    "stryker",
    "zimmer biomet",
    "intuitive surgical",
    "eli lilly",
    "takeda",
    "boehringer ingelheim",
    "bayer",
    "celgene",
    "iqvia",
    "covance",
    "parexel",
    "psi",
    "icon",
    "syneos",
    "ppd",
    "quintiles",
    "celerion",
    "medpace",
    "worldwide clinical trials",
    "labcorp",
    "quest diagnostics",
    "eurofins",
    "charles river",
    "wuxi",
    "catalent",
    "lonza",
    "samsung biologics",
    "boehringer",
    "teva",
    "mylan",
    "sandoz",
    "hospira",
    "fresenius",
    "baxter",
    // private medical institutions and clinics
    "mayo clinic",
    "cleveland clinic",
    "johns hopkins",
    "kaiser permanente",
    "memorial sloan kettering",
    "md anderson",
    "cedars-sinai",
    "scripps",
    "intermountain healthcare",
    "geisinger",
    "henry ford health",
    // research institutes with industry ties
    "sarah cannon research institute",
    "translational genomics research institute",
    "broad institute",
    "whitehead institute",
    "cold spring harbor laboratory",
];

/// Substrings of an email address that mark it as academic.
pub const ACADEMIC_DOMAIN_MARKERS: &[&str] =
    &[".edu", ".ac.", ".edu.", "university", "college", "institute"];

/// Keyword tables consulted by the scorers.
///
/// Built once at start-up and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct Lexicon {
    pub academic_keywords: Vec<String>,
    pub industry_keywords: Vec<String>,
    pub known_companies: Vec<String>,
    pub academic_domain_markers: Vec<String>,
}

impl Lexicon {
    /// Built-in tables extended with extra company names.
    ///
    /// Extra names are lower-cased and trimmed; blanks and duplicates are dropped.
    pub fn with_extra_companies<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut lexicon = Self::default();
        for name in extra {
            let name = name.as_ref().trim().to_lowercase();
            if !name.is_empty() && !lexicon.known_companies.contains(&name) {
                lexicon.known_companies.push(name);
            }
        }
        lexicon
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            academic_keywords: owned(ACADEMIC_KEYWORDS),
            industry_keywords: owned(INDUSTRY_KEYWORDS),
            known_companies: owned(KNOWN_COMPANIES),
            academic_domain_markers: owned(ACADEMIC_DOMAIN_MARKERS),
        }
    }
}
