// Prompt templates for every language-model call site.

use crate::executor::QueryRows;
use crate::schema::SchemaDescription;

/// System prompt for the first SQL generation of a question.
pub fn sql_system_prompt(schema: &SchemaDescription) -> String {
    format!(
        r#"You are an expert SQLite analyst for a personal-finance application.
Translate the user's question into ONE SQLite SELECT statement over the schema below.

## SCHEMA
{}
## RULES
- Return ONLY the SQL statement. No explanations, no Markdown.
- Use only the tables and columns listed above; never invent columns.
- Dates are stored as ISO text (YYYY-MM-DD); use strftime() and date() for date arithmetic.
- Spending is in `debit`, income in `credit`. Categories live in `transaction_info.label`.
- Never modify data: INSERT, UPDATE, DELETE and DDL statements are rejected.
"#,
        schema.render()
    )
}

/// System prompt asking the model to correct a query that failed to execute.
/// Always carries the original question so context does not drift across
/// attempts.
pub fn repair_prompt(
    question: &str,
    failed_query: &str,
    prior_result: Option<&QueryRows>,
    error_message: &str,
    schema: &SchemaDescription,
) -> String {
    let prior = match prior_result {
        Some(rows) => serde_json::to_string(rows).unwrap_or_else(|_| "None".to_string()),
        None => "None".to_string(),
    };

    format!(
        r#"You are an expert SQLite analyst. A query you wrote for the question below failed.

QUESTION: {question}

FAILED QUERY:
{failed_query}

RESULT: {prior}

ERROR: {error_message}

## SCHEMA
{schema}
## TASK
Return a corrected single SQLite SELECT statement that answers the QUESTION.
Return ONLY the SQL statement. No explanations, no Markdown."#,
        question = question,
        failed_query = failed_query,
        prior = prior,
        error_message = error_message,
        schema = schema.render(),
    )
}

pub const CLASSIFICATION_SYSTEM_PROMPT: &str = r#"You are an advanced AI specialized in classifying bank transaction descriptions into one of the specified categories.
Answer with exactly one of these labels and nothing else: Food, Fuel, EMI, Super Market, IPMS, Travel, Others

Categories:
Food: restaurants, cafes and food delivery. Keywords: McDonald's, Starbucks, KFC, Domino's, Pizza Hut, Swiggy, Zomato, Dunzo, FreshMenu, Faasos; terms about dining, food orders or meal delivery.
Fuel: fuel stations and refuelling. Keywords: Indian Oil, Bharat Petroleum, Hindustan Petroleum, Reliance, Shell; "petrol", "diesel", "refuel".
EMI: equated monthly installments and financing. Keywords: EMI, Loan, Installment, Financing, Repayment; scheduled payments to banks such as SBI, HDFC, ICICI, Axis Bank, Kotak Mahindra Bank.
Super Market: grocery stores, general merchandise and online marketplaces. Keywords: Big Bazaar, D-Mart, Reliance Fresh, More, Spencer's, Flipkart Groceries, Amazon Pantry, JioMart, Paytm Mall. "Paytm" alone is NOT Super Market; only "Paytm Mall" is.
IPMS: fund transfers and inventory/property management systems. Keywords: IMPS, Fund Transfer, Inventory, Property Management.
Travel: travel bookings and transport. Keywords: Air India, IndiGo, SpiceJet, Vistara, APSRTC, KSRTC, RedBus, IRCTC, MakeMyTrip, Yatra, Cleartrip, hotels, Zoomcar, Ola, Uber.
Others: anything ambiguous, incomplete, or not clearly matching a category above.

If a description references several categories, choose the most specific one for the transaction type.

Examples:
PCA:5000944243:037044001941265 BIG BAZAAR SUPERMARKET 037044001941265-733608213111 -> Super Market
PCA:5000944243 KFC RESTAURANT ORDER 120300061754 SWIGGY DELIVERY -> Food
PCA:5000944243:075023049500001 INDIAN OIL FUELING STATION 075023049500001-733715033212 -> Fuel
PCA:5000944243 EMI PAYMENT LOAN #1234567890 -> EMI
PCA:5000944243:049500001 ONLINE PURCHASE TRANSACTION -> Others
PCA:5000944243:191919191923024 RELIANCE FRESH SERVICESP 191919191923024-733610335879 -> Super Market
PCA:5000944243:APSRTCONLINE512 EBS*APSRTC ONLINEIN MUMBAI IND-021670016907 -> Travel
PCA:5000944243:FLIGHTBOOKING AIRINDIA NEWDELHI-BOM12345678 -> Travel
PCA:5000944243:IMPS TRANSFER HDFC BANK -> IPMS
"#;

pub const STATEMENT_INFO_SYSTEM_PROMPT: &str =
    "You are an advanced AI trained to extract key information from bank statements.";

pub fn statement_info_prompt(text: &str, json_schema: &str) -> String {
    format!(
        r#"Extract the account details from the bank statement header below.
Return ONLY a JSON object, no extra text, with these keys:
BankName, PersonName, PersonAddress, CustomerID, BranchName, BranchAddress, IFSC, AccountNo.
Use an empty string for any value that is not present.

JSON schema of the expected object:
{json_schema}

Statement header:
{text}

ExtractedInfo:"#,
        json_schema = json_schema,
        text = text,
    )
}

pub const GOAL_ENTITIES_SYSTEM_PROMPT: &str =
    "You are an assistant that extracts specified entities from sentences.";

pub fn goal_entities_prompt(sentence: &str) -> String {
    format!(
        r#"Extract entities related to 'assets', 'time_period', and 'total_amount' from the following sentence.
Only consider the following entities:
Assets: [car, home, marriage, bike, flat, plots, personal]
Time_period: [1month, 3month, 6month, 9month, 1year, 2year, 3year, 4year, 5year, 7year, 10year, 15year, 20year]
Total_amount: [amount in numeric format]
Example: 'I want to buy a car costing 50000 and a house costing 200000 in 2 years.'
Output: {{"assets": ["car", "home"], "time_period": ["2year"], "total_amount": [50000, 200000]}}

Now extract from this sentence:

"{sentence}"

Return ONLY a JSON object in this format: {{"assets": [list of assets], "time_period": [time period], "total_amount": [list of amounts]}}."#,
        sentence = sentence
    )
}
