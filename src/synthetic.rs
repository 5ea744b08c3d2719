// 🎲 Synthetic Identities - Names, companies, emails and addresses
//
// Every draw goes through the caller's RNG so a seeded run produces the
// same people and the same descriptions.

use chrono::{Duration, NaiveDate};
use rand::seq::SliceRandom;
use rand::Rng;

const FIRST_NAMES: &[&str] = &[
    "James", "Mary", "Robert", "Patricia", "John", "Jennifer", "Michael", "Linda", "David",
    "Elizabeth", "William", "Barbara", "Richard", "Susan", "Joseph", "Jessica", "Thomas", "Sarah",
    "Charles", "Karen", "Daniel", "Nancy", "Matthew", "Lisa", "Anthony", "Betty", "Mark",
    "Margaret", "Donald", "Sandra", "Steven", "Ashley", "Paul", "Kimberly", "Andrew", "Emily",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas", "Taylor",
    "Moore", "Jackson", "Martin", "Lee", "Perez", "Thompson", "White", "Harris", "Sanchez",
    "Clark", "Ramirez", "Lewis", "Robinson", "Walker", "Young", "Allen", "King", "Wright",
];

const COMPANIES: &[&str] = &[
    "Barclays", "Tesco", "Unilever", "Rolls-Royce", "Vodafone", "Aviva", "Diageo", "Rentokil",
    "Sainsbury's", "Kingfisher", "Halma", "Persimmon", "Whitbread", "Burberry", "Ocado",
    "Compass Group", "Legal & General", "Smiths Group", "Severn Trent", "Pearson",
];

const EMAIL_DOMAIN: &str = "demo-domain.org";

const DEFAULT_CITY: &str = "San Francisco";

/// Address before it is attached to a customer
#[derive(Debug, Clone, PartialEq)]
pub struct AddressTemplate {
    pub address_line_one: &'static str,
    pub address_line_two: Option<&'static str>,
    pub city: Option<&'static str>,
    pub state: &'static str,
    pub postal_code: &'static str,
}

impl AddressTemplate {
    /// Some pool entries carry no city
    pub fn city(&self) -> &'static str {
        self.city.unwrap_or(DEFAULT_CITY)
    }
}

const ADDRESSES: &[AddressTemplate] = &[
    AddressTemplate { address_line_one: "1745 T Street Southeast", address_line_two: None, city: Some("Washington"), state: "DC", postal_code: "20020" },
    AddressTemplate { address_line_one: "6007 Applegate Lane", address_line_two: None, city: Some("Louisville"), state: "KY", postal_code: "40219" },
    AddressTemplate { address_line_one: "560 Penstock Drive", address_line_two: None, city: Some("Grass Valley"), state: "CA", postal_code: "95945" },
    AddressTemplate { address_line_one: "150 Carter Street", address_line_two: None, city: Some("Manchester"), state: "CT", postal_code: "06040" },
    AddressTemplate { address_line_one: "2721 Lindsay Avenue", address_line_two: None, city: Some("Louisville"), state: "KY", postal_code: "40206" },
    AddressTemplate { address_line_one: "18 Densmore Drive", address_line_two: None, city: Some("Essex"), state: "VT", postal_code: "05452" },
    AddressTemplate { address_line_one: "637 Britannia Drive", address_line_two: None, city: Some("Vallejo"), state: "CA", postal_code: "94591" },
    AddressTemplate { address_line_one: "5601 West Crocus Drive", address_line_two: None, city: Some("Glendale"), state: "AZ", postal_code: "85306" },
    AddressTemplate { address_line_one: "5403 Illinois Avenue", address_line_two: None, city: Some("Nashville"), state: "TN", postal_code: "37209" },
    AddressTemplate { address_line_one: "8821 West Myrtle Avenue", address_line_two: None, city: Some("Glendale"), state: "AZ", postal_code: "85305" },
    AddressTemplate { address_line_one: "2203 7th Street Road", address_line_two: None, city: Some("Louisville"), state: "KY", postal_code: "40208" },
    AddressTemplate { address_line_one: "1427 South Carolina Avenue Southeast", address_line_two: None, city: Some("Washington"), state: "DC", postal_code: "20003" },
    AddressTemplate { address_line_one: "5811 Crossings Boulevard", address_line_two: None, city: Some("Nashville"), state: "TN", postal_code: "37013" },
    AddressTemplate { address_line_one: "5108 Franklin Street", address_line_two: None, city: Some("Savannah"), state: "GA", postal_code: "31405" },
    AddressTemplate { address_line_one: "913 Fallview Trail", address_line_two: None, city: Some("Nashville"), state: "TN", postal_code: "37211" },
    AddressTemplate { address_line_one: "270 Chrissy's Court", address_line_two: None, city: Some("Bristol"), state: "VT", postal_code: "05443" },
    AddressTemplate { address_line_one: "130 Old Route 103", address_line_two: None, city: None, state: "VT", postal_code: "05143" },
    AddressTemplate { address_line_one: "10826 Pointe Royal Drive", address_line_two: None, city: Some("Bakersfield"), state: "CA", postal_code: "93311" },
    AddressTemplate { address_line_one: "74 Springfield Street", address_line_two: Some("B"), city: Some("Agawam"), state: "MA", postal_code: "01001" },
    AddressTemplate { address_line_one: "2905 Stonebridge Court", address_line_two: None, city: Some("Norman"), state: "OK", postal_code: "73071" },
    AddressTemplate { address_line_one: "20930 Todd Valley Road", address_line_two: None, city: Some("Foresthill"), state: "CA", postal_code: "95631" },
    AddressTemplate { address_line_one: "5928 West Mauna Loa Lane", address_line_two: None, city: Some("Glendale"), state: "AZ", postal_code: "85306" },
    AddressTemplate { address_line_one: "802 Madison Street Northwest", address_line_two: None, city: Some("Washington"), state: "DC", postal_code: "20011" },
    AddressTemplate { address_line_one: "2811 Battery Place Northwest", address_line_two: None, city: Some("Washington"), state: "DC", postal_code: "20016" },
    AddressTemplate { address_line_one: "210 Lacross Lane", address_line_two: None, city: Some("Westmore"), state: "VT", postal_code: "05860" },
    AddressTemplate { address_line_one: "2010 Rising Hill Drive", address_line_two: None, city: Some("Norman"), state: "OK", postal_code: "73071" },
    AddressTemplate { address_line_one: "388 East Main Street", address_line_two: Some("Suite 11"), city: Some("Bristol"), state: "VT", postal_code: "05443" },
    AddressTemplate { address_line_one: "1033 Ellington Road", address_line_two: None, city: Some("South Windsor"), state: "CT", postal_code: "06074" },
];

const PAYMENT_TOPICS: &[&str] = &[
    "gifts", "mobile phone", "school fees", "cleaner", "babysitting", "contractors", "gym", "repairs",
];

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn pick<R: Rng + ?Sized>(rng: &mut R, pool: &[&'static str]) -> &'static str {
    // pools are non-empty constants
    pool.choose(rng).copied().unwrap_or_default()
}

pub fn first_name<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    pick(rng, FIRST_NAMES)
}

pub fn last_name<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    pick(rng, LAST_NAMES)
}

pub fn company<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    pick(rng, COMPANIES)
}

pub fn payment_topic<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    pick(rng, PAYMENT_TOPICS)
}

pub fn address<R: Rng + ?Sized>(rng: &mut R) -> &'static AddressTemplate {
    &ADDRESSES[rng.gen_range(0..ADDRESSES.len())]
}

pub fn random_letters<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())] as char)
        .collect()
}

/// `{3-6 letters}{3-6 letters}@demo-domain.org`
pub fn email<R: Rng + ?Sized>(rng: &mut R) -> String {
    let prefix_length = rng.gen_range(3..=6);
    let suffix_length = rng.gen_range(3..=6);
    let prefix = random_letters(rng, prefix_length);
    let suffix = random_letters(rng, suffix_length);
    format!("{}{}@{}", prefix, suffix, EMAIL_DOMAIN)
}

/// Uniform date between 100 and 18 years (of 365 days) before `today`
pub fn date_of_birth<R: Rng + ?Sized>(rng: &mut R, today: NaiveDate) -> NaiveDate {
    let earliest = today - Duration::days(365 * 100);
    let latest = today - Duration::days(365 * 18);
    let span = (latest - earliest).num_days();
    earliest + Duration::days(rng.gen_range(0..=span))
}

/// (prefix 1-9, number 100000-999999) for an account number
pub fn account_number_parts<R: Rng + ?Sized>(rng: &mut R) -> (u8, u32) {
    (rng.gen_range(1..=9), rng.gen_range(100_000..=999_999))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_email_shape() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..50 {
            let email = email(&mut rng);
            let (local, domain) = email.split_once('@').unwrap();
            assert_eq!(domain, "demo-domain.org");
            assert!((6..=12).contains(&local.len()));
            assert!(local.chars().all(|c| c.is_ascii_alphabetic()));
        }
    }

    #[test]
    fn test_date_of_birth_window() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        for _ in 0..200 {
            let dob = date_of_birth(&mut rng, today);
            assert!(dob <= today - Duration::days(365 * 18));
            assert!(dob >= today - Duration::days(365 * 100));
        }
    }

    #[test]
    fn test_address_without_city_falls_back() {
        let no_city = ADDRESSES.iter().find(|a| a.city.is_none()).unwrap();
        assert_eq!(no_city.city(), "San Francisco");
    }

    #[test]
    fn test_same_seed_same_identities() {
        let mut a = ChaCha8Rng::seed_from_u64(99);
        let mut b = ChaCha8Rng::seed_from_u64(99);
        for _ in 0..10 {
            assert_eq!(first_name(&mut a), first_name(&mut b));
            assert_eq!(email(&mut a), email(&mut b));
            assert_eq!(account_number_parts(&mut a), account_number_parts(&mut b));
        }
    }
}
